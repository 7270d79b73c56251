//! Debug tooling
//!
//! - [`FrameController`] - pause, single step and time scale as an advance policy
//! - [`DebugState`] - overlay state reporting update and render rates

pub mod debug_state;
pub mod frame_control;

pub use debug_state::{DebugState, FRAME_HISTORY_SIZE};
pub use frame_control::{FrameController, TIME_SCALE_OPTIONS};
