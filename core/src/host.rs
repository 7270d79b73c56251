//! Contracts between the scheduler and the host application

use std::sync::{Arc, Mutex};

use ff_graphics::{CommandContext, RenderTargets};

use crate::app_time::AppTimeHandle;
use crate::debug::FrameController;
use crate::input::{InputDevices, InputHandle};
use crate::state::{AdvanceType, Cursor, SharedState};

/// What one frame renders through
pub struct RenderFrame<'a> {
    pub context: &'a mut dyn CommandContext,
    pub targets: &'a mut dyn RenderTargets,
}

/// Presents frames for the game thread.
///
/// Lives on the game thread for its whole life.
pub trait RenderHost: Send {
    /// Prepares the next frame. `None` skips rendering for this frame.
    fn begin_render(&mut self) -> Option<RenderFrame<'_>>;

    /// Completes the frame, called whether or not `begin_render` succeeded
    fn end_render(&mut self, rendered: bool);

    /// Releases transient GPU memory while the game thread is paused
    fn trim(&mut self) {}
}

/// Requests from the game thread that must run on the main thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainThreadEvent {
    SetCursor(Cursor),
    SaveSettings,
    /// The state tree died and the game thread is exiting on its own
    GameStopped,
}

/// Game-thread services handed to the initial state factory
#[derive(Clone)]
pub struct StateContext {
    pub time: AppTimeHandle,
    pub input: InputHandle,
}

type StateFactory = Box<dyn FnOnce(&StateContext) -> Option<SharedState> + Send>;

/// Host callbacks consumed by the scheduler.
///
/// Everything here is created on the main thread and moved to the game
/// thread, where the initial state is built.
pub struct AppParams {
    pub create_initial_state: Option<StateFactory>,
    pub advance_type: Box<dyn FnMut() -> AdvanceType + Send>,
    pub time_scale: Box<dyn FnMut() -> f64 + Send>,
    pub game_thread_started: Option<Box<dyn FnOnce() + Send>>,
    pub game_thread_finished: Option<Box<dyn FnOnce() + Send>>,
    pub input_devices: Vec<Box<dyn InputDevices + Send>>,
}

impl Default for AppParams {
    fn default() -> Self {
        Self {
            create_initial_state: None,
            advance_type: Box::new(|| AdvanceType::Running),
            time_scale: Box::new(|| 1.0),
            game_thread_started: None,
            game_thread_finished: None,
            input_devices: Vec::new(),
        }
    }
}

impl AppParams {
    pub fn with_initial_state(
        mut self,
        factory: impl FnOnce(&StateContext) -> Option<SharedState> + Send + 'static,
    ) -> Self {
        self.create_initial_state = Some(Box::new(factory));
        self
    }

    pub fn with_input_device(mut self, device: impl InputDevices + Send + 'static) -> Self {
        self.input_devices.push(Box::new(device));
        self
    }

    /// Drives pause, single step and time scale from a shared controller
    pub fn with_frame_controller(mut self, controller: Arc<Mutex<FrameController>>) -> Self {
        let advance = Arc::clone(&controller);
        self.advance_type = Box::new(move || match advance.lock() {
            Ok(mut controller) => controller.next_advance_type(),
            Err(_) => AdvanceType::Running,
        });
        self.time_scale = Box::new(move || match controller.lock() {
            Ok(controller) => controller.time_scale(),
            Err(_) => 1.0,
        });
        self
    }
}
