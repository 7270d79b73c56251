//! Runtime configuration

use crate::config::SchedulerConfig;

/// Runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Fixed update rate in Hz
    pub updates_per_second: u32,
    /// Update budget for one frame at normal speed
    pub max_updates_per_frame: usize,
    /// Largest budget multiplier while fast-forwarding
    pub max_update_multiplier: usize,
    /// Whether the root of the state tree gets a [`crate::DebugState`]
    pub debug_state: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

impl From<&SchedulerConfig> for RuntimeConfig {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            updates_per_second: config.updates_per_second.max(1),
            max_updates_per_frame: config.max_updates_per_frame.max(1) as usize,
            max_update_multiplier: config.max_update_multiplier.max(1) as usize,
            debug_state: config.debug_state,
        }
    }
}

impl RuntimeConfig {
    /// Length of one fixed update
    pub fn seconds_per_update(&self) -> f64 {
        1.0 / f64::from(self.updates_per_second.max(1))
    }
}
