//! Engine settings in `config.toml`
//!
//! Every field has a serde default, so a partial or empty file still loads.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Frame scheduler and game thread settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Frame scheduler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Fixed update rate in Hz (default: 60)
    #[serde(default = "default_updates_per_second")]
    pub updates_per_second: u32,
    /// Updates allowed in one frame before the backlog is dropped (default: 4)
    #[serde(default = "default_max_updates_per_frame")]
    pub max_updates_per_frame: u32,
    /// Upper bound on the budget multiplier while fast-forwarding (default: 4)
    #[serde(default = "default_max_update_multiplier")]
    pub max_update_multiplier: u32,
    /// How long the main thread waits for the game thread to pause or stop (default: 10s)
    #[serde(default = "default_hang_timeout_ms")]
    pub hang_timeout_ms: u64,
    /// Disables the hang timeout so a stuck game thread can be inspected
    #[serde(default)]
    pub debugger_attached: bool,
    /// Adds the debug state to the root of the state tree
    #[serde(default = "default_debug_state")]
    pub debug_state: bool,
}

fn default_updates_per_second() -> u32 {
    60
}

fn default_max_updates_per_frame() -> u32 {
    4
}

fn default_max_update_multiplier() -> u32 {
    4
}

fn default_hang_timeout_ms() -> u64 {
    10_000
}

fn default_debug_state() -> bool {
    cfg!(debug_assertions)
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            updates_per_second: default_updates_per_second(),
            max_updates_per_frame: default_max_updates_per_frame(),
            max_update_multiplier: default_max_update_multiplier(),
            hang_timeout_ms: default_hang_timeout_ms(),
            debugger_attached: false,
            debug_state: default_debug_state(),
        }
    }
}

impl SchedulerConfig {
    /// Hang timeout, or `None` while a debugger is attached
    pub fn hang_timeout(&self) -> Option<Duration> {
        if self.debugger_attached {
            None
        } else {
            Some(Duration::from_millis(self.hang_timeout_ms))
        }
    }
}

/// Per-user config directory, `None` without a home directory
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "ff").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Reads `config.toml`, falling back to defaults when it is missing or broken
pub fn load() -> Config {
    let Some(path) = config_dir().map(|dir| dir.join("config.toml")) else {
        return Config::default();
    };

    if !path.exists() {
        return Config::default();
    }

    load_from(&path).unwrap_or_else(|e| {
        tracing::warn!("Using default config: {e:#}");
        Config::default()
    })
}

pub fn load_from(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn parse(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Writes `config.toml` into [`config_dir`], creating it as needed
pub fn save(config: &Config) -> Result<(), ConfigError> {
    match config_dir() {
        Some(dir) => save_to(&dir.join("config.toml"), config),
        None => {
            tracing::warn!("No config directory, settings not saved");
            Ok(())
        }
    }
}

pub fn save_to(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    tracing::debug!("Saved config to {}", path.display());
    Ok(())
}
