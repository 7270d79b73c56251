//! Monotonic clock and scaled game timer

use std::time::Instant;

/// Source of monotonic seconds from an arbitrary epoch.
///
/// Values must never decrease.
pub trait Clock {
    fn now_seconds(&self) -> f64;
}

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_seconds(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// Accumulates scaled seconds between ticks.
///
/// `seconds()` advances at `time_scale` times the rate of the clock, and
/// changing the scale only affects time that passes afterwards.
pub struct Timer {
    clock: Box<dyn Clock>,
    reset_time: f64,
    start_time: f64,
    cur_time: f64,
    start_seconds: f64,
    seconds: f64,
    clock_seconds: f64,
    delta_seconds: f64,
    time_scale: f64,
}

impl Timer {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        let now = clock.now_seconds();
        Self {
            clock,
            reset_time: now,
            start_time: now,
            cur_time: now,
            start_seconds: 0.0,
            seconds: 0.0,
            clock_seconds: 0.0,
            delta_seconds: 0.0,
            time_scale: 1.0,
        }
    }

    /// Samples the clock and returns the scaled seconds that passed.
    ///
    /// With `forced_offset`, exactly that many seconds are added instead of
    /// the measured time and the timer rebases on the current clock value.
    pub fn tick(&mut self, forced_offset: Option<f64>) -> f64 {
        self.cur_time = self.clock.now_seconds();
        self.clock_seconds = self.cur_time - self.reset_time;

        match forced_offset {
            None => {
                let old_seconds = self.seconds;
                self.seconds =
                    self.start_seconds + self.time_scale * (self.cur_time - self.start_time);
                self.delta_seconds = (self.seconds - old_seconds).max(0.0);
            }
            Some(offset) => {
                self.delta_seconds = offset;
                self.seconds += offset;
                self.start_seconds = self.seconds;
                self.start_time = self.cur_time;
            }
        }

        self.delta_seconds
    }

    /// Restarts from zero. The time scale is kept.
    pub fn reset(&mut self) {
        let now = self.clock.now_seconds();
        self.reset_time = now;
        self.start_time = now;
        self.cur_time = now;
        self.start_seconds = 0.0;
        self.seconds = 0.0;
        self.clock_seconds = 0.0;
        self.delta_seconds = 0.0;
    }

    /// Scaled seconds accumulated up to the last tick
    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    /// Unscaled clock seconds since creation or the last reset
    pub fn clock_seconds(&self) -> f64 {
        self.clock_seconds
    }

    /// Scaled seconds that passed during the last tick
    pub fn delta_seconds(&self) -> f64 {
        self.delta_seconds
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, scale: f64) {
        if scale != self.time_scale {
            self.time_scale = scale;
            self.start_seconds = self.seconds;
            self.start_time = self.cur_time;
        }
    }
}
