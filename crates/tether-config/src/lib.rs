//! Tether configuration
//!
//! Loads spawn defaults, runner settings and logging level from an optional
//! TOML file layered under `TETHER__`-prefixed environment variables.

pub mod error;
pub mod loader;
pub mod types;

pub use error::{ConfigError, Result};
pub use loader::ConfigLoader;
pub use types::{LoggingConfig, RunnerConfig, TetherConfig};
