//! Core configuration types

use serde::{Deserialize, Serialize};
use tether_process::SpawnOverrides;

/// Log levels accepted by `logging.level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct TetherConfig {
    /// Default spawn overrides applied beneath per-command options
    pub spawn: SpawnOverrides,
    /// Polling/timeout behaviour of `tether run`
    pub runner: RunnerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Interval between status/output polls
    pub poll_interval_ms: u64,
    /// Kill the process tree after this many seconds (None = never)
    pub kill_after_secs: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Max level: trace, debug, info, warn or error
    pub level: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            kill_after_secs: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
