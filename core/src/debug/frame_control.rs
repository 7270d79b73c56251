//! Pause, single step and time scale as the scheduler's advance policy
//!
//! Hosts share a [`FrameController`] behind a mutex: the UI writes it, and
//! [`crate::AppParams::with_frame_controller`] reads it once per frame on
//! the game thread.

use crate::state::AdvanceType;

/// Time scales the controller steps through, slowest first
pub const TIME_SCALE_OPTIONS: [f64; 6] = [0.1, 0.25, 0.5, 1.0, 2.0, 4.0];

const NORMAL_SCALE: usize = 3;

#[derive(Debug, Clone)]
pub struct FrameController {
    paused: bool,
    pending_step: bool,
    scale: usize,
    /// A locked controller reports normal running and ignores input
    locked: bool,
}

impl Default for FrameController {
    fn default() -> Self {
        Self {
            paused: false,
            pending_step: false,
            scale: NORMAL_SCALE,
            locked: false,
        }
    }
}

impl FrameController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the controller at normal speed, running
    pub fn lock(&mut self) {
        self.reset();
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_paused(&self) -> bool {
        self.paused && !self.locked
    }

    pub fn time_scale(&self) -> f64 {
        if self.locked {
            return 1.0;
        }
        TIME_SCALE_OPTIONS[self.scale]
    }

    pub fn scale_index(&self) -> usize {
        self.scale
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.locked {
            return;
        }
        self.paused = paused;
        self.pending_step &= paused;
    }

    pub fn toggle_pause(&mut self) {
        self.set_paused(!self.paused);
    }

    /// Lets exactly one update through while paused
    pub fn request_step(&mut self) {
        self.pending_step = self.is_paused();
    }

    pub fn slower(&mut self) {
        if !self.locked {
            self.scale = self.scale.saturating_sub(1);
        }
    }

    pub fn faster(&mut self) {
        if !self.locked {
            self.scale = (self.scale + 1).min(TIME_SCALE_OPTIONS.len() - 1);
        }
    }

    /// Picks the preset closest to `scale`
    pub fn set_time_scale(&mut self, scale: f64) {
        if self.locked {
            return;
        }
        let distance = |index: &usize| (TIME_SCALE_OPTIONS[*index] - scale).abs();
        self.scale = (0..TIME_SCALE_OPTIONS.len())
            .min_by(|a, b| distance(a).total_cmp(&distance(b)))
            .unwrap_or(NORMAL_SCALE);
    }

    /// Advance type for the coming frame; takes any pending step
    pub fn next_advance_type(&mut self) -> AdvanceType {
        match (self.is_paused(), std::mem::take(&mut self.pending_step)) {
            (false, _) => AdvanceType::Running,
            (true, true) => AdvanceType::SingleStep,
            (true, false) => AdvanceType::Stopped,
        }
    }

    /// Running at normal speed; leaves the lock as it is
    pub fn reset(&mut self) {
        self.paused = false;
        self.pending_step = false;
        self.scale = NORMAL_SCALE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_at_normal_speed_by_default() {
        let mut controller = FrameController::new();
        assert_eq!(controller.next_advance_type(), AdvanceType::Running);
        assert_eq!(controller.time_scale(), 1.0);
        assert_eq!(controller.scale_index(), NORMAL_SCALE);
    }

    #[test]
    fn test_paused_controller_steps_once() {
        let mut controller = FrameController::new();
        controller.toggle_pause();
        assert_eq!(controller.next_advance_type(), AdvanceType::Stopped);

        controller.request_step();
        assert_eq!(controller.next_advance_type(), AdvanceType::SingleStep);
        assert_eq!(controller.next_advance_type(), AdvanceType::Stopped);

        controller.toggle_pause();
        assert_eq!(controller.next_advance_type(), AdvanceType::Running);
    }

    #[test]
    fn test_step_needs_pause() {
        let mut controller = FrameController::new();
        controller.request_step();
        controller.set_paused(true);
        assert_eq!(controller.next_advance_type(), AdvanceType::Stopped);

        // A step requested while paused is dropped by resuming
        controller.request_step();
        controller.set_paused(false);
        controller.set_paused(true);
        assert_eq!(controller.next_advance_type(), AdvanceType::Stopped);
    }

    #[test]
    fn test_scale_stays_within_presets() {
        let mut controller = FrameController::new();
        for _ in 0..10 {
            controller.slower();
        }
        assert_eq!(controller.time_scale(), 0.1);

        for _ in 0..10 {
            controller.faster();
        }
        assert_eq!(controller.time_scale(), 4.0);
    }

    #[test]
    fn test_set_time_scale_picks_closest_preset() {
        let mut controller = FrameController::new();
        for (requested, expected) in [(0.3, 0.25), (0.4, 0.5), (1.4, 1.0), (3.1, 4.0), (100.0, 4.0)] {
            controller.set_time_scale(requested);
            assert_eq!(controller.time_scale(), expected, "requested {requested}");
        }
    }

    #[test]
    fn test_locked_controller_ignores_input() {
        let mut controller = FrameController::new();
        controller.set_paused(true);
        controller.slower();

        controller.lock();
        controller.toggle_pause();
        controller.faster();
        assert!(controller.is_locked());
        assert!(!controller.is_paused());
        assert_eq!(controller.time_scale(), 1.0);
        assert_eq!(controller.next_advance_type(), AdvanceType::Running);

        controller.unlock();
        controller.set_paused(true);
        assert_eq!(controller.next_advance_type(), AdvanceType::Stopped);
    }
}
