//! Shared test utilities for unit tests

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};

use ff_graphics::{CommandContext, DepthTarget, RenderTargets, Target, TextureFormat, WindowSize};

use crate::host::{AppParams, MainThreadEvent, RenderFrame, RenderHost};
use crate::input::{InputDevices, VirtualKey};
use crate::runtime::{Runtime, RuntimeConfig};
use crate::state::{AdvanceType, Cursor, SharedState, State, Status};
use crate::timer::Clock;

// ============================================================================
// Logging
// ============================================================================

/// Shows log output under `RUST_LOG` when tests run
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Clock
// ============================================================================

/// Clock that only moves when told to
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, seconds: f64) {
        self.0.store(seconds.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now_seconds() + seconds);
    }
}

impl Clock for ManualClock {
    fn now_seconds(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::SeqCst))
    }
}

// ============================================================================
// States
// ============================================================================

pub type CallLog = Rc<RefCell<Vec<String>>>;

pub fn call_log() -> CallLog {
    CallLog::default()
}

/// State that logs every hook as `name:hook`
pub struct RecordingState {
    pub name: &'static str,
    log: CallLog,
    pub status: Status,
    pub cursor: Cursor,
    pub updates: usize,
    /// Becomes dead during this update
    pub die_after: Option<usize>,
    /// Returned from the next update
    pub replacement: Option<SharedState>,
    pub settings_loaded: usize,
    pub settings_saved: usize,
}

impl RecordingState {
    pub fn new(name: &'static str, log: &CallLog) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            name,
            log: log.clone(),
            status: Status::Alive,
            cursor: Cursor::Default,
            updates: 0,
            die_after: None,
            replacement: None,
            settings_loaded: 0,
            settings_saved: 0,
        }))
    }

    pub fn with_status(name: &'static str, log: &CallLog, status: Status) -> Rc<RefCell<Self>> {
        let state = Self::new(name, log);
        state.borrow_mut().status = status;
        state
    }

    fn record(&self, hook: &str) {
        self.log.borrow_mut().push(format!("{}:{hook}", self.name));
    }
}

impl State for RecordingState {
    fn advance_time(&mut self) -> Option<SharedState> {
        self.updates += 1;
        self.record("advance_time");
        if self.die_after == Some(self.updates) {
            self.status = Status::Dead;
        }
        self.replacement.take()
    }

    fn advance_input(&mut self) {
        self.record("advance_input");
    }

    fn render(&mut self, _context: &mut dyn CommandContext, _targets: &mut dyn RenderTargets) {
        self.record("render");
    }

    fn frame_started(&mut self, advance_type: AdvanceType) {
        self.record(&format!("frame_started:{advance_type:?}"));
    }

    fn frame_rendering(
        &mut self,
        _advance_type: AdvanceType,
        _context: &mut dyn CommandContext,
        _targets: &mut dyn RenderTargets,
    ) {
        self.record("frame_rendering");
    }

    fn frame_rendered(
        &mut self,
        _advance_type: AdvanceType,
        _context: &mut dyn CommandContext,
        _targets: &mut dyn RenderTargets,
    ) {
        self.record("frame_rendered");
    }

    fn save_settings(&mut self) {
        self.settings_saved += 1;
    }

    fn load_settings(&mut self) {
        self.settings_loaded += 1;
    }

    fn cursor(&self) -> Cursor {
        self.cursor
    }

    fn status(&self) -> Status {
        self.status
    }
}

// ============================================================================
// Render host
// ============================================================================

pub struct TestContext;

impl CommandContext for TestContext {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub struct TestTarget;

impl Target for TestTarget {
    fn size(&self) -> WindowSize {
        WindowSize::new(320.0, 240.0)
    }

    fn format(&self) -> TextureFormat {
        TextureFormat::Rgba8Unorm
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub struct TestTargets {
    target: TestTarget,
}

impl TestTargets {
    pub fn new() -> Self {
        Self { target: TestTarget }
    }
}

impl RenderTargets for TestTargets {
    fn target_and_depth(&mut self) -> (&mut dyn Target, Option<&mut dyn DepthTarget>) {
        (&mut self.target, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    BeginRender,
    EndRender { rendered: bool },
    Trim,
}

/// Render host that records calls into a log shared with the test
pub struct RecordingHost {
    pub log: Arc<Mutex<Vec<HostEvent>>>,
    pub fail_begin: Arc<AtomicBool>,
    context: TestContext,
    targets: TestTargets,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            log: Arc::default(),
            fail_begin: Arc::default(),
            context: TestContext,
            targets: TestTargets::new(),
        }
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, event: HostEvent) -> usize {
        self.log.lock().unwrap().iter().filter(|e| **e == event).count()
    }
}

impl RenderHost for RecordingHost {
    fn begin_render(&mut self) -> Option<RenderFrame<'_>> {
        self.log.lock().unwrap().push(HostEvent::BeginRender);
        if self.fail_begin.load(Ordering::SeqCst) {
            return None;
        }
        Some(RenderFrame {
            context: &mut self.context,
            targets: &mut self.targets,
        })
    }

    fn end_render(&mut self, rendered: bool) {
        self.log.lock().unwrap().push(HostEvent::EndRender { rendered });
    }

    fn trim(&mut self) {
        self.log.lock().unwrap().push(HostEvent::Trim);
    }
}

// ============================================================================
// Input
// ============================================================================

/// Input device with fixed answers
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    pub pressed: Vec<VirtualKey>,
    pub counts: Vec<(VirtualKey, i32)>,
    pub analog: Vec<(VirtualKey, f32)>,
    pub updates: Arc<AtomicUsize>,
}

impl ScriptedInput {
    pub fn press(mut self, key: VirtualKey) -> Self {
        self.pressed.push(key);
        self
    }

    pub fn count(mut self, key: VirtualKey, count: i32) -> Self {
        self.counts.push((key, count));
        self
    }

    pub fn analog(mut self, key: VirtualKey, value: f32) -> Self {
        self.analog.push((key, value));
        self
    }
}

impl InputDevices for ScriptedInput {
    fn update(&mut self) {
        self.updates.fetch_add(1, Ordering::SeqCst);
    }

    fn pressing(&self, key: VirtualKey) -> bool {
        self.pressed.contains(&key)
    }

    fn press_count(&self, key: VirtualKey) -> i32 {
        self.counts
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, count)| count)
            .sum()
    }

    fn analog_value(&self, key: VirtualKey) -> f32 {
        self.analog
            .iter()
            .find(|(k, _)| *k == key)
            .map_or(0.0, |(_, value)| *value)
    }
}

// ============================================================================
// Runtime
// ============================================================================

/// Runtime config with an update length that is exact in binary
pub fn test_config() -> RuntimeConfig {
    RuntimeConfig {
        updates_per_second: 64,
        max_updates_per_frame: 4,
        max_update_multiplier: 4,
        debug_state: false,
    }
}

pub const SECONDS_PER_UPDATE: f64 = 1.0 / 64.0;

pub struct TestRuntime {
    pub runtime: Runtime<RecordingHost>,
    pub clock: ManualClock,
    pub events: Receiver<MainThreadEvent>,
    pub host_log: Arc<Mutex<Vec<HostEvent>>>,
}

/// A runtime whose root holds `state`, driven by a manual clock
pub fn test_runtime(config: RuntimeConfig, params: AppParams, state: Option<SharedState>) -> TestRuntime {
    let clock = ManualClock::new();
    let (tx, events) = mpsc::channel();
    let host = RecordingHost::new();
    let host_log = host.log.clone();

    let params = match state {
        Some(state) => {
            // The factory must be Send; the state is handed over through a thread-local slot
            INITIAL_STATE.with(|slot| *slot.borrow_mut() = Some(state));
            params.with_initial_state(|_| INITIAL_STATE.with(|slot| slot.borrow_mut().take()))
        }
        None => params,
    };

    let runtime = Runtime::with_clock(config, host, params, tx, Box::new(clock.clone()));
    TestRuntime {
        runtime,
        clock,
        events,
        host_log,
    }
}

thread_local! {
    static INITIAL_STATE: RefCell<Option<SharedState>> = const { RefCell::new(None) };
}

impl TestRuntime {
    /// Advances the clock by `seconds`, then runs one frame
    pub fn frame_after(&mut self, seconds: f64) -> usize {
        self.clock.advance(seconds);
        self.runtime.frame();
        self.runtime.frame_updates()
    }

    pub fn drain_events(&self) -> Vec<MainThreadEvent> {
        self.events.try_iter().collect()
    }

    pub fn host_events(&self) -> Vec<HostEvent> {
        self.host_log.lock().unwrap().clone()
    }
}
