//! Dedicated game thread
//!
//! The main thread owns a [`GameThread`] handle and talks to the loop
//! through a request channel. Every blocking call waits on an
//! acknowledgement channel, bounded by a [`WaitPolicy`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::host::{MainThreadEvent, RenderHost};
use crate::runtime::Runtime;

#[cfg(test)]
mod tests;

/// Lifecycle of the game thread as seen from the main thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GameThreadState {
    /// Not spawned yet
    None = 0,
    Stopped = 1,
    Running = 2,
    Pausing = 3,
    Paused = 4,
}

impl GameThreadState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Stopped,
            2 => Self::Running,
            3 => Self::Pausing,
            4 => Self::Paused,
            _ => Self::None,
        }
    }
}

/// What to do when the game thread misses a deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HangAction {
    /// Log and abort the process
    Terminate,
    /// Return [`SchedulerError::GameThreadHung`] to the caller
    ReturnError,
}

/// Bound on how long the main thread blocks on the game thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// `None` waits forever
    pub timeout: Option<Duration>,
    pub on_timeout: HangAction,
}

impl WaitPolicy {
    /// Terminates on a hang, never times out with a debugger attached
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            timeout: config.hang_timeout(),
            on_timeout: HangAction::Terminate,
        }
    }

    pub fn returning_error(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            on_timeout: HangAction::ReturnError,
        }
    }

    fn timed_out(&self, waiting_for: Ack) -> Result<(), SchedulerError> {
        let timeout = self.timeout.unwrap_or_default();
        match self.on_timeout {
            HangAction::Terminate => {
                error!(
                    "Game thread did not acknowledge {waiting_for:?} within {timeout:?}, terminating"
                );
                std::process::abort()
            }
            HangAction::ReturnError => Err(SchedulerError::GameThreadHung(timeout)),
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}

type Task<H> = Box<dyn FnOnce(&mut Runtime<H>) + Send>;
type RuntimeFactory<H> = Box<dyn FnOnce() -> Runtime<H> + Send>;

enum Request<H: RenderHost> {
    Start,
    Pause,
    Stop,
    Dispatch(Task<H>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ack {
    Ready,
    Paused,
    Stopped,
}

/// Main-thread handle to the game thread.
///
/// The runtime is built on the game thread by the factory passed to
/// [`GameThread::new`], so state trees never need to be `Send`. Dropping
/// the handle stops the thread and joins it.
pub struct GameThread<H: RenderHost + 'static> {
    policy: WaitPolicy,
    init: Option<RuntimeFactory<H>>,
    state: Arc<AtomicU8>,
    requests: Option<Sender<Request<H>>>,
    acks: Option<Receiver<Ack>>,
    handle: Option<JoinHandle<()>>,
}

impl<H: RenderHost + 'static> GameThread<H> {
    /// Creates the handle without spawning. [`GameThread::start`] spawns on first use.
    pub fn new(policy: WaitPolicy, init: impl FnOnce() -> Runtime<H> + Send + 'static) -> Self {
        Self {
            policy,
            init: Some(Box::new(init)),
            state: Arc::new(AtomicU8::new(GameThreadState::None as u8)),
            requests: None,
            acks: None,
            handle: None,
        }
    }

    /// Spawns right away and waits until the runtime is built
    pub fn spawn(
        policy: WaitPolicy,
        init: impl FnOnce() -> Runtime<H> + Send + 'static,
    ) -> Result<Self, SchedulerError> {
        let mut thread = Self::new(policy, init);
        thread.ensure_spawned()?;
        Ok(thread)
    }

    /// Lets frames run. Does not wait for the first frame.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        self.ensure_spawned()?;
        self.send(Request::Start)
    }

    /// Blocks until the game thread has finished its frame and parked.
    ///
    /// Returns immediately if the thread was never spawned.
    pub fn pause(&mut self) -> Result<(), SchedulerError> {
        if self.handle.is_none() {
            return Ok(());
        }
        self.drain_stale_acks()?;
        self.send(Request::Pause)?;
        self.wait_for(Ack::Paused)?;
        debug!("Game thread paused");
        Ok(())
    }

    /// Tears down the runtime on the game thread and joins it
    pub fn stop(&mut self) -> Result<(), SchedulerError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        // The thread may have already stopped on its own
        if let Some(requests) = self.requests.take() {
            let _ = requests.send(Request::Stop);
        }

        match self.wait_for(Ack::Stopped) {
            Ok(()) => {
                if handle.join().is_err() {
                    warn!("Game thread panicked during shutdown");
                }
                info!("Game thread stopped");
                Ok(())
            }
            Err(err) => {
                warn!("Detaching unresponsive game thread: {err}");
                Err(err)
            }
        }
    }

    /// Runs `task` on the game thread between frames
    pub fn dispatch(
        &self,
        task: impl FnOnce(&mut Runtime<H>) + Send + 'static,
    ) -> Result<(), SchedulerError> {
        self.send(Request::Dispatch(Box::new(task)))
    }

    pub fn state(&self) -> GameThreadState {
        GameThreadState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_alive(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        self.policy
    }

    pub fn set_wait_policy(&mut self, policy: WaitPolicy) {
        self.policy = policy;
    }

    fn ensure_spawned(&mut self) -> Result<(), SchedulerError> {
        if self.handle.is_some() {
            return Ok(());
        }
        let init = self.init.take().ok_or(SchedulerError::GameThreadExited)?;

        let (request_tx, request_rx) = mpsc::channel();
        let (ack_tx, ack_rx) = mpsc::channel();
        let state = Arc::clone(&self.state);

        let handle = thread::Builder::new()
            .name("ff::game_loop".into())
            .spawn(move || {
                let game_loop = GameLoop {
                    runtime: init(),
                    requests: request_rx,
                    acks: ack_tx,
                    state,
                };
                game_loop.run();
            })?;

        self.requests = Some(request_tx);
        self.acks = Some(ack_rx);
        self.handle = Some(handle);
        info!("Game thread spawned");

        self.wait_for(Ack::Ready)
    }

    fn send(&self, request: Request<H>) -> Result<(), SchedulerError> {
        let requests = self
            .requests
            .as_ref()
            .ok_or(SchedulerError::GameThreadExited)?;
        requests
            .send(request)
            .map_err(|_| SchedulerError::GameThreadExited)
    }

    /// Drops acknowledgements that arrived after their wait timed out
    fn drain_stale_acks(&self) -> Result<(), SchedulerError> {
        let Some(acks) = self.acks.as_ref() else {
            return Ok(());
        };
        for ack in acks.try_iter() {
            if ack == Ack::Stopped {
                return Err(SchedulerError::GameThreadExited);
            }
            debug!("Dropping stale {ack:?} acknowledgement");
        }
        Ok(())
    }

    fn wait_for(&self, expected: Ack) -> Result<(), SchedulerError> {
        let acks = self.acks.as_ref().ok_or(SchedulerError::GameThreadExited)?;
        let deadline = self.policy.timeout.map(|timeout| Instant::now() + timeout);

        loop {
            let received = match deadline {
                Some(deadline) => {
                    acks.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                }
                None => acks.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(ack) if ack == expected => return Ok(()),
                Ok(Ack::Stopped) => return Err(SchedulerError::GameThreadExited),
                Ok(ack) => debug!("Skipping stale {ack:?} acknowledgement"),
                Err(RecvTimeoutError::Disconnected) if expected == Ack::Stopped => return Ok(()),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SchedulerError::GameThreadExited);
                }
                Err(RecvTimeoutError::Timeout) => return self.policy.timed_out(expected),
            }
        }
    }
}

impl<H: RenderHost + 'static> Drop for GameThread<H> {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!("Game thread did not stop cleanly: {err}");
        }
    }
}

/// Game-thread side of the handshake
struct GameLoop<H: RenderHost> {
    runtime: Runtime<H>,
    requests: Receiver<Request<H>>,
    acks: Sender<Ack>,
    state: Arc<AtomicU8>,
}

impl<H: RenderHost> GameLoop<H> {
    fn run(mut self) {
        self.set_state(GameThreadState::Stopped);
        self.ack(Ack::Ready);

        loop {
            if !self.drain_requests() {
                break;
            }

            match self.state() {
                GameThreadState::Running => {
                    if self.runtime.is_finished() {
                        info!("State tree finished, stopping game thread");
                        self.runtime.post(MainThreadEvent::GameStopped);
                        break;
                    }
                    self.runtime.frame();
                }
                GameThreadState::Pausing => {
                    self.runtime.pause();
                    self.set_state(GameThreadState::Paused);
                    self.ack(Ack::Paused);
                }
                _ => {
                    // Parked until the main thread asks for something
                    let Ok(request) = self.requests.recv() else {
                        break;
                    };
                    if !self.handle(request) {
                        break;
                    }
                }
            }
        }

        self.runtime.shutdown();
        self.set_state(GameThreadState::Stopped);
        self.ack(Ack::Stopped);
        debug!("Game thread exiting");
    }

    /// Returns false once asked to stop
    fn drain_requests(&mut self) -> bool {
        loop {
            match self.requests.try_recv() {
                Ok(request) => {
                    if !self.handle(request) {
                        return false;
                    }
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn handle(&mut self, request: Request<H>) -> bool {
        match request {
            Request::Start => {
                if self.state() != GameThreadState::Running {
                    debug!("Game thread running");
                    self.set_state(GameThreadState::Running);
                }
            }
            Request::Pause => {
                if self.state() == GameThreadState::Running {
                    self.set_state(GameThreadState::Pausing);
                } else {
                    self.ack(Ack::Paused);
                }
            }
            Request::Stop => return false,
            Request::Dispatch(task) => task(&mut self.runtime),
        }
        true
    }

    fn state(&self) -> GameThreadState {
        GameThreadState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: GameThreadState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn ack(&self, ack: Ack) {
        if self.acks.send(ack).is_err() {
            debug!("Main thread stopped listening for {ack:?}");
        }
    }
}
