//! Frame timing published by the scheduler

use std::cell::Cell;
use std::rc::Rc;

/// Timing snapshot for the current frame.
///
/// Written by the scheduler once per frame and once per update, read-only
/// everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AppTime {
    /// Frames that ran with time moving
    pub frame_count: u64,
    /// Frames that reached the render host
    pub render_count: u64,
    /// Fixed updates since start
    pub update_count: u64,
    /// Unscaled clock seconds since start
    pub clock_seconds: f64,
    /// `update_count` expressed in seconds
    pub update_seconds: f64,
    /// Scaled time not yet consumed by a fixed update, always >= 0
    pub unused_update_seconds: f64,
    /// 0 while stopped
    pub time_scale: f64,
    /// Scaled timer seconds since start
    pub app_seconds: f64,
}

/// Read access to the scheduler's [`AppTime`] from inside the state tree
#[derive(Debug, Clone, Default)]
pub struct AppTimeHandle(Rc<Cell<AppTime>>);

impl AppTimeHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> AppTime {
        self.0.get()
    }

    pub(crate) fn publish(&self, time: AppTime) {
        self.0.set(time);
    }
}
