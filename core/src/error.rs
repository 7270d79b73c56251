//! Error types for the scheduler and configuration

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced to the main thread by [`crate::GameThread`]
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("failed to spawn game thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("game thread has exited")]
    GameThreadExited,

    #[error("game thread did not respond within {0:?}")]
    GameThreadHung(Duration),
}

/// Errors from reading or writing `config.toml`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
