//! Frame scheduler
//!
//! Runs one frame at a time on the game thread: poll input, advance the
//! state tree by zero or more fixed updates, then render once.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::Sender;

use crate::app_time::{AppTime, AppTimeHandle};
use crate::debug::DebugState;
use crate::host::{AppParams, MainThreadEvent, RenderFrame, RenderHost, StateContext};
use crate::input::{CombinedInput, InputHandle};
use crate::state::{self, AdvanceType, Cursor, SharedState, State, StateList, StateWrapper, Status};
use crate::timer::{Clock, SystemClock, Timer};

mod config;


pub use config::RuntimeConfig;

/// Game-thread side of the application.
///
/// Owns the state tree, the timer and the render host. Not `Send`: it is
/// built on the game thread and never leaves it.
pub struct Runtime<H: RenderHost> {
    config: RuntimeConfig,
    host: H,
    input: InputHandle,
    timer: Timer,
    time: AppTime,
    time_handle: AppTimeHandle,
    root: StateWrapper,
    debug: Option<Rc<RefCell<DebugState>>>,
    advance_type_fn: Box<dyn FnMut() -> AdvanceType + Send>,
    time_scale_fn: Box<dyn FnMut() -> f64 + Send>,
    game_thread_finished: Option<Box<dyn FnOnce() + Send>>,
    events: Sender<MainThreadEvent>,
    previous_advance: AdvanceType,
    frame_updates: usize,
    cursor: Cursor,
}

impl<H: RenderHost> Runtime<H> {
    pub fn new(
        config: RuntimeConfig,
        host: H,
        params: AppParams,
        events: Sender<MainThreadEvent>,
    ) -> Self {
        Self::with_clock(config, host, params, events, Box::new(SystemClock::new()))
    }

    /// Builds the root of the state tree: the initial state and the optional
    /// debug state side by side in a list.
    pub fn with_clock(
        config: RuntimeConfig,
        host: H,
        params: AppParams,
        events: Sender<MainThreadEvent>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let AppParams {
            create_initial_state,
            advance_type,
            time_scale,
            game_thread_started,
            game_thread_finished,
            input_devices,
        } = params;

        if let Some(started) = game_thread_started {
            started();
        }

        let time_handle = AppTimeHandle::new();
        let input = InputHandle::new(CombinedInput::new(input_devices));
        let context = StateContext {
            time: time_handle.clone(),
            input: input.clone(),
        };

        let mut states: Vec<SharedState> = Vec::new();
        if let Some(initial) = create_initial_state.and_then(|create| create(&context)) {
            states.push(initial);
        }

        let debug = config
            .debug_state
            .then(|| Rc::new(RefCell::new(DebugState::new(time_handle.clone()))));
        if let Some(debug) = &debug {
            states.push(debug.clone());
        }

        tracing::debug!(
            "Game thread started with {} root states at {} updates/s",
            states.len(),
            config.updates_per_second
        );

        let mut root = StateWrapper::new(Some(state::shared(StateList::new(states))));
        root.load_settings();

        Self {
            config,
            host,
            input,
            timer: Timer::new(clock),
            time: AppTime::default(),
            time_handle,
            root,
            debug,
            advance_type_fn: advance_type,
            time_scale_fn: time_scale,
            game_thread_finished,
            events,
            previous_advance: AdvanceType::Stopped,
            frame_updates: 0,
            cursor: Cursor::Default,
        }
    }

    /// Runs one frame and returns how time moved during it
    pub fn frame(&mut self) -> AdvanceType {
        // Input comes before the timer since it can change how time moves
        self.advance_input();

        let advance_type = self.start_timer();
        self.root.frame_started(advance_type);

        self.frame_updates = 0;
        while self.advance_timer(advance_type) {
            if self.frame_updates > 1 {
                self.advance_input();
            }
            self.root.advance_time();
        }

        self.render(advance_type);
        self.update_cursor();

        self.previous_advance = advance_type;
        advance_type
    }

    /// True once nothing in the state tree is left to run
    pub fn is_finished(&self) -> bool {
        self.root.status() == Status::Dead
    }

    /// Saves settings and releases transient resources before the game
    /// thread blocks. The next frame restarts timing with a single update.
    pub fn pause(&mut self) {
        self.previous_advance = AdvanceType::Stopped;
        self.root.save_settings();
        self.post(MainThreadEvent::SaveSettings);
        self.host.trim();
    }

    /// Tears down the state tree. The runtime renders nothing afterwards.
    pub fn shutdown(&mut self) {
        self.post(MainThreadEvent::SaveSettings);
        self.host.trim();
        self.root.reset();
        self.debug = None;

        if let Some(finished) = self.game_thread_finished.take() {
            finished();
        }
    }

    pub fn app_time(&self) -> AppTime {
        self.time
    }

    pub fn app_time_handle(&self) -> &AppTimeHandle {
        &self.time_handle
    }

    pub fn input(&self) -> &InputHandle {
        &self.input
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Updates run by the last frame
    pub fn frame_updates(&self) -> usize {
        self.frame_updates
    }

    pub fn root(&self) -> &StateWrapper {
        &self.root
    }

    pub fn debug_state(&self) -> Option<&Rc<RefCell<DebugState>>> {
        self.debug.as_ref()
    }

    fn advance_input(&mut self) {
        self.input.update();
        self.root.advance_input();
    }

    fn start_timer(&mut self) -> AdvanceType {
        let time_scale = (self.time_scale_fn)();
        let advance_type = if time_scale > 0.0 {
            (self.advance_type_fn)()
        } else {
            AdvanceType::Stopped
        };
        let running = advance_type != AdvanceType::Stopped;
        let was_running = self.previous_advance == AdvanceType::Running;

        self.time.time_scale = if running { time_scale } else { 0.0 };
        self.time.frame_count += u64::from(running);
        self.timer.set_time_scale(self.time.time_scale);

        // Coming out of a stop, credit exactly one update instead of the wall time that passed
        let delta = if was_running {
            self.timer.tick(None)
        } else {
            self.timer
                .tick(Some(self.config.seconds_per_update() * self.time.time_scale))
        };

        self.time.unused_update_seconds += delta;
        self.time.clock_seconds = self.timer.clock_seconds();
        self.time.app_seconds = self.timer.seconds();
        self.time_handle.publish(self.time);

        advance_type
    }

    fn advance_timer(&mut self, advance_type: AdvanceType) -> bool {
        let seconds_per_update = self.config.seconds_per_update();
        let mut max_updates = self.config.max_updates_per_frame;

        match advance_type {
            AdvanceType::Stopped => {
                self.time.unused_update_seconds = 0.0;
                return false;
            }
            AdvanceType::SingleStep => {
                if self.frame_updates > 0 {
                    self.time.unused_update_seconds = 0.0;
                    return false;
                }
            }
            AdvanceType::Running => {
                if self.time.unused_update_seconds < seconds_per_update {
                    return false;
                }
                if self.time.time_scale > 1.0 {
                    let multiplier = (self.time.time_scale.ceil() as usize)
                        .min(self.config.max_update_multiplier);
                    max_updates *= multiplier;
                }
            }
        }

        if self.frame_updates >= max_updates {
            tracing::debug!(
                "Dropping {:.3}s of update backlog after {} updates",
                self.time.unused_update_seconds,
                self.frame_updates
            );
            self.time.unused_update_seconds = 0.0;
            return false;
        }

        self.time.unused_update_seconds =
            (self.time.unused_update_seconds - seconds_per_update).max(0.0);
        self.time.update_count += 1;
        self.time.update_seconds = self.time.update_count as f64 * seconds_per_update;
        self.frame_updates += 1;
        self.time_handle.publish(self.time);
        true
    }

    fn render(&mut self, advance_type: AdvanceType) {
        let rendered = match self.host.begin_render() {
            Some(RenderFrame { context, targets }) => {
                self.root.frame_rendering(advance_type, context, targets);
                self.root.render(context, targets);
                self.root.frame_rendered(advance_type, context, targets);
                true
            }
            None => {
                tracing::trace!("Render host skipped frame {}", self.time.frame_count);
                false
            }
        };

        if rendered {
            self.time.render_count += 1;
            self.time_handle.publish(self.time);
        }

        self.host.end_render(rendered);
    }

    fn update_cursor(&mut self) {
        let cursor = self.root.cursor();
        if cursor != self.cursor {
            self.cursor = cursor;
            self.post(MainThreadEvent::SetCursor(cursor));
        }
    }

    pub(crate) fn post(&self, event: MainThreadEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("Main thread gone, dropped {event:?}");
        }
    }
}
