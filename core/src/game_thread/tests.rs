//! Game thread handshake tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::*;
use crate::config::SchedulerConfig;
use crate::host::{AppParams, MainThreadEvent, RenderFrame, RenderHost};
use crate::state::{self, SharedState, State, Status};
use crate::test_utils::{TestContext, TestTargets, init_tracing, test_config};

const PATIENCE: Duration = Duration::from_secs(5);

/// Renders every frame and sleeps a little so the loop does not spin
struct PacedHost {
    frames: Arc<AtomicUsize>,
    trims: Arc<AtomicUsize>,
    context: TestContext,
    targets: TestTargets,
}

impl RenderHost for PacedHost {
    fn begin_render(&mut self) -> Option<RenderFrame<'_>> {
        Some(RenderFrame {
            context: &mut self.context,
            targets: &mut self.targets,
        })
    }

    fn end_render(&mut self, _rendered: bool) {
        self.frames.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(1));
    }

    fn trim(&mut self) {
        self.trims.fetch_add(1, Ordering::SeqCst);
    }
}

struct CountingState {
    updates: Arc<AtomicUsize>,
    die_after: Option<usize>,
    status: Status,
}

impl State for CountingState {
    fn advance_time(&mut self) -> Option<SharedState> {
        let updates = self.updates.fetch_add(1, Ordering::SeqCst) + 1;
        if self.die_after == Some(updates) {
            self.status = Status::Dead;
        }
        None
    }

    fn status(&self) -> Status {
        self.status
    }
}

#[derive(Clone, Default)]
struct Counters {
    frames: Arc<AtomicUsize>,
    trims: Arc<AtomicUsize>,
    updates: Arc<AtomicUsize>,
    finished: Arc<AtomicBool>,
}

impl Counters {
    fn frames(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }

    fn trims(&self) -> usize {
        self.trims.load(Ordering::SeqCst)
    }
}

fn runtime_factory(
    counters: &Counters,
    die_after: Option<usize>,
) -> (impl FnOnce() -> Runtime<PacedHost> + Send + 'static, Receiver<MainThreadEvent>) {
    let (tx, events) = mpsc::channel();
    let counters = counters.clone();

    let init = move || {
        let host = PacedHost {
            frames: counters.frames,
            trims: counters.trims,
            context: TestContext,
            targets: TestTargets::new(),
        };
        let updates = counters.updates;
        let finished = counters.finished;

        let params = AppParams {
            game_thread_finished: Some(Box::new(move || finished.store(true, Ordering::SeqCst))),
            ..AppParams::default()
        }
        .with_initial_state(move |_| {
            Some(state::shared(CountingState {
                updates,
                die_after,
                status: Status::Alive,
            }))
        });

        Runtime::new(test_config(), host, params, tx)
    };

    (init, events)
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + PATIENCE;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

fn patient_policy() -> WaitPolicy {
    WaitPolicy::returning_error(PATIENCE)
}

// ============================================================================
// Wait policy
// ============================================================================

#[test]
fn test_policy_from_config() {
    let config = SchedulerConfig::default();
    let policy = WaitPolicy::from_config(&config);
    assert_eq!(policy.timeout, Some(Duration::from_millis(10_000)));
    assert_eq!(policy.on_timeout, HangAction::Terminate);

    let debugging = SchedulerConfig {
        debugger_attached: true,
        ..SchedulerConfig::default()
    };
    assert_eq!(WaitPolicy::from_config(&debugging).timeout, None);
}

#[test]
fn test_state_round_trips_through_u8() {
    for state in [
        GameThreadState::None,
        GameThreadState::Stopped,
        GameThreadState::Running,
        GameThreadState::Pausing,
        GameThreadState::Paused,
    ] {
        assert_eq!(GameThreadState::from_u8(state as u8), state);
    }
    assert_eq!(GameThreadState::from_u8(200), GameThreadState::None);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_start_spawns_lazily() {
    let counters = Counters::default();
    let (init, _events) = runtime_factory(&counters, None);

    let mut game = GameThread::new(patient_policy(), init);
    assert_eq!(game.state(), GameThreadState::None);
    assert!(!game.is_alive());

    // Pausing an unspawned thread is a no-op
    game.pause().unwrap();
    assert_eq!(game.state(), GameThreadState::None);

    game.start().unwrap();
    assert!(game.is_alive());
    assert!(wait_until(|| counters.frames() > 0));
    assert_eq!(game.state(), GameThreadState::Running);

    game.stop().unwrap();
}

#[test]
fn test_spawned_thread_waits_for_start() {
    let counters = Counters::default();
    let (init, _events) = runtime_factory(&counters, None);

    let game = GameThread::spawn(patient_policy(), init).unwrap();
    assert_eq!(game.state(), GameThreadState::Stopped);

    thread::sleep(Duration::from_millis(20));
    assert_eq!(counters.frames(), 0);
}

#[test]
fn test_pause_resume_stop() {
    let counters = Counters::default();
    let (init, events) = runtime_factory(&counters, None);

    let mut game = GameThread::spawn(patient_policy(), init).unwrap();
    game.start().unwrap();
    assert!(wait_until(|| counters.frames() >= 3));

    game.pause().unwrap();
    assert_eq!(game.state(), GameThreadState::Paused);
    assert_eq!(counters.trims(), 1);
    assert_eq!(events.try_recv(), Ok(MainThreadEvent::SaveSettings));

    let paused_at = counters.frames();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(counters.frames(), paused_at);

    game.start().unwrap();
    assert!(wait_until(|| counters.frames() > paused_at));

    game.stop().unwrap();
    assert_eq!(game.state(), GameThreadState::Stopped);
    assert!(!game.is_alive());
    assert!(counters.finished.load(Ordering::SeqCst));

    // Stopping twice is harmless, starting again is not possible
    game.stop().unwrap();
    assert!(matches!(game.start(), Err(SchedulerError::GameThreadExited)));
}

#[test]
fn test_pause_twice_acks_immediately() {
    let counters = Counters::default();
    let (init, _events) = runtime_factory(&counters, None);

    let mut game = GameThread::spawn(patient_policy(), init).unwrap();
    game.start().unwrap();
    assert!(wait_until(|| counters.frames() > 0));

    game.pause().unwrap();
    game.pause().unwrap();
    assert_eq!(game.state(), GameThreadState::Paused);
    assert_eq!(counters.trims(), 1);
}

#[test]
fn test_drop_stops_thread() {
    let counters = Counters::default();
    let (init, _events) = runtime_factory(&counters, None);

    let mut game = GameThread::spawn(patient_policy(), init).unwrap();
    game.start().unwrap();
    assert!(wait_until(|| counters.frames() > 0));

    drop(game);
    assert!(counters.finished.load(Ordering::SeqCst));
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_dispatch_runs_on_game_thread() {
    let counters = Counters::default();
    let (init, _events) = runtime_factory(&counters, None);
    let game = GameThread::spawn(patient_policy(), init).unwrap();

    let (tx, rx) = mpsc::channel();
    game.dispatch(move |runtime| {
        let name = thread::current().name().map(str::to_owned);
        let _ = tx.send((name, runtime.root().status()));
    })
    .unwrap();

    let (name, status) = rx.recv_timeout(PATIENCE).unwrap();
    assert_eq!(name.as_deref(), Some("ff::game_loop"));
    assert_eq!(status, Status::Alive);
}

// ============================================================================
// Self stop
// ============================================================================

#[test]
fn test_dead_state_tree_stops_thread() {
    init_tracing();
    let counters = Counters::default();
    let (init, events) = runtime_factory(&counters, Some(3));

    let mut game = GameThread::spawn(patient_policy(), init).unwrap();
    game.start().unwrap();

    let stopped = events
        .iter()
        .find(|event| *event == MainThreadEvent::GameStopped);
    assert_eq!(stopped, Some(MainThreadEvent::GameStopped));
    assert_eq!(counters.updates.load(Ordering::SeqCst), 3);

    assert!(wait_until(|| !game.is_alive()));
    assert_eq!(game.state(), GameThreadState::Stopped);
    assert!(matches!(game.pause(), Err(SchedulerError::GameThreadExited)));
    game.stop().unwrap();
}

// ============================================================================
// Hang handling
// ============================================================================

#[test]
fn test_hung_thread_returns_error() {
    init_tracing();
    let counters = Counters::default();
    let (init, _events) = runtime_factory(&counters, None);

    let mut game = GameThread::spawn(patient_policy(), init).unwrap();
    game.start().unwrap();
    game.dispatch(|_| thread::sleep(Duration::from_millis(300)))
        .unwrap();

    game.set_wait_policy(WaitPolicy::returning_error(Duration::from_millis(20)));
    assert!(matches!(
        game.pause(),
        Err(SchedulerError::GameThreadHung(timeout)) if timeout == Duration::from_millis(20)
    ));

    // The late pause acknowledgement is skipped while stopping
    game.set_wait_policy(patient_policy());
    game.stop().unwrap();
    assert!(counters.finished.load(Ordering::SeqCst));
}

#[test]
fn test_late_pause_ack_does_not_satisfy_next_pause() {
    init_tracing();
    let counters = Counters::default();
    let (init, _events) = runtime_factory(&counters, None);

    let mut game = GameThread::spawn(patient_policy(), init).unwrap();
    game.start().unwrap();
    assert!(wait_until(|| counters.frames() > 0));
    game.dispatch(|_| thread::sleep(Duration::from_millis(300)))
        .unwrap();

    game.set_wait_policy(WaitPolicy::returning_error(Duration::from_millis(20)));
    assert!(game.pause().is_err());

    // Let the late acknowledgement land in the channel
    assert!(wait_until(|| game.state() == GameThreadState::Paused));
    thread::sleep(Duration::from_millis(20));

    game.set_wait_policy(patient_policy());
    game.start().unwrap();
    game.dispatch(|_| thread::sleep(Duration::from_millis(100)))
        .unwrap();
    game.pause().unwrap();
    assert_eq!(game.state(), GameThreadState::Paused);
    assert_eq!(counters.trims(), 2);

    game.stop().unwrap();
}
