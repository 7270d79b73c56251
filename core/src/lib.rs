//! ff core - game thread and frame scheduling
//!
//! Runs a fixed-timestep simulation on a dedicated game thread, decoupled
//! from rendering, and drives a tree of application states.
//!
//! # Architecture
//!
//! - [`GameThread`] - Main-thread handle: start, pause, stop, dispatch
//! - [`Runtime`] - Per-frame loop: input, fixed updates, one render
//! - [`State`] - Node of the state tree, with [`StateWrapper`] and [`StateList`] combinators
//! - [`RenderHost`] - Supplies a command context and targets for each frame
//! - [`DebugState`] / [`FrameController`] - Update rate overlay and pause/step/time-scale policy

pub mod app_time;
pub mod config;
pub mod debug;
pub mod error;
pub mod game_thread;
pub mod host;
pub mod input;
pub mod runtime;
pub mod state;
pub mod timer;

#[cfg(test)]
pub(crate) mod test_utils;

pub use app_time::{AppTime, AppTimeHandle};
pub use config::{Config, SchedulerConfig};
pub use debug::{DebugState, FrameController};
pub use error::{ConfigError, SchedulerError};
pub use game_thread::{GameThread, GameThreadState, HangAction, WaitPolicy};
pub use host::{AppParams, MainThreadEvent, RenderFrame, RenderHost, StateContext};
pub use input::{CombinedInput, InputDevices, InputHandle, NullInput, VirtualKey};
pub use runtime::{Runtime, RuntimeConfig};
pub use state::{AdvanceType, Cursor, SharedState, State, StateList, StateWrapper, Status};
pub use timer::{Clock, SystemClock, Timer};
