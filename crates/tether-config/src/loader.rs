//! Configuration loader

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use tracing::debug;

use crate::{
    error::{ConfigError, Result},
    types::{TetherConfig, LOG_LEVELS},
};

/// Environment variable prefix, e.g. `TETHER__RUNNER__POLL_INTERVAL_MS`
pub const ENV_PREFIX: &str = "TETHER";

/// Loads [`TetherConfig`] from file and environment
pub struct ConfigLoader {
    /// Configuration file path
    config_path: PathBuf,
    /// Environment prefix
    env_prefix: String,
    /// Replaces the process environment when set
    env_vars: Option<config::Map<String, String>>,
}

impl ConfigLoader {
    /// Loader for the default per-user config file
    pub fn new() -> Self {
        Self::with_path(Self::default_config_path())
    }

    /// Loader for an explicit config file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            env_prefix: ENV_PREFIX.to_string(),
            env_vars: None,
        }
    }

    /// Read variables from `vars` instead of the process environment
    pub fn with_env_vars<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.env_vars = Some(vars.into_iter().collect());
        self
    }

    /// `<config_dir>/tether/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tether")
            .join("config.toml")
    }

    /// Path the loader reads from
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load and validate configuration; a missing file yields defaults
    pub fn load(&self) -> Result<TetherConfig> {
        debug!(path = %self.config_path.display(), "Loading configuration");

        let env = Environment::with_prefix(&self.env_prefix)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .source(self.env_vars.clone());

        let config = Config::builder()
            .add_source(File::from(self.config_path.clone()).required(false))
            .add_source(env)
            .build()?;

        let tether_config: TetherConfig = config.try_deserialize()?;
        Self::validate(&tether_config)?;
        Ok(tether_config)
    }

    /// Reject settings the runner cannot honour
    pub fn validate(config: &TetherConfig) -> Result<()> {
        if config.runner.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "runner.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        let level = config.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "unknown logging.level '{}' (expected one of {})",
                config.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TetherConfig {
    /// Render as TOML, e.g. for `tether config`
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }
}
