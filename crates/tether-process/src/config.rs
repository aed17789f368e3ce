//! Spawn configuration
//!
//! [`SpawnOverrides`] is the caller-facing override map: every key is optional
//! and unset keys fall through to the defaults held by [`SpawnConfig`].
//! Override sets can be stacked with [`SpawnOverrides::layer`] before being
//! applied, so file-level defaults and per-call options compose key by key.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How a single standard stream of the child is connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StdioMode {
    /// Connected to the null device
    Ignore,
    /// Redirected into a pipe readable by the handle
    Piped,
}

impl StdioMode {
    pub(crate) fn to_stdio(self) -> std::process::Stdio {
        match self {
            StdioMode::Ignore => std::process::Stdio::null(),
            StdioMode::Piped => std::process::Stdio::piped(),
        }
    }
}

/// Fully resolved configuration used to launch a process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnConfig {
    /// Disown the child from the parent's process group/session
    pub detached: bool,
    /// Standard input wiring
    pub stdin: StdioMode,
    /// Standard output wiring
    pub stdout: StdioMode,
    /// Standard error wiring
    pub stderr: StdioMode,
    /// Window-visibility hint (Windows only)
    pub hide_window: bool,
    /// Working directory (None = inherit)
    pub working_dir: Option<PathBuf>,
    /// Environment variables added on top of the parent environment
    pub env: HashMap<String, String>,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            detached: true,
            stdin: StdioMode::Ignore,
            stdout: StdioMode::Piped,
            stderr: StdioMode::Piped,
            hide_window: true,
            working_dir: None,
            env: HashMap::new(),
        }
    }
}

impl SpawnConfig {
    /// Resolve overrides against the defaults
    pub fn from_overrides(overrides: &SpawnOverrides) -> Self {
        let defaults = Self::default();
        let mut env = defaults.env;
        env.extend(overrides.env.iter().map(|(k, v)| (k.clone(), v.clone())));

        Self {
            detached: overrides.detached.unwrap_or(defaults.detached),
            stdin: overrides.stdin.unwrap_or(defaults.stdin),
            stdout: overrides.stdout.unwrap_or(defaults.stdout),
            stderr: overrides.stderr.unwrap_or(defaults.stderr),
            hide_window: overrides.hide_window.unwrap_or(defaults.hide_window),
            working_dir: overrides.working_dir.clone().or(defaults.working_dir),
            env,
        }
    }

    /// Whether any output stream is captured
    pub fn captures_output(&self) -> bool {
        self.stdout == StdioMode::Piped || self.stderr == StdioMode::Piped
    }
}

/// Caller-supplied overrides; `None` keeps the default
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnOverrides {
    pub detached: Option<bool>,
    pub stdin: Option<StdioMode>,
    pub stdout: Option<StdioMode>,
    pub stderr: Option<StdioMode>,
    pub hide_window: Option<bool>,
    pub working_dir: Option<PathBuf>,
    pub env: HashMap<String, String>,
}

impl SpawnOverrides {
    /// Create an empty override set
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack `top` over `self`; keys set in `top` win
    pub fn layer(mut self, top: SpawnOverrides) -> Self {
        self.detached = top.detached.or(self.detached);
        self.stdin = top.stdin.or(self.stdin);
        self.stdout = top.stdout.or(self.stdout);
        self.stderr = top.stderr.or(self.stderr);
        self.hide_window = top.hide_window.or(self.hide_window);
        self.working_dir = top.working_dir.or(self.working_dir);
        self.env.extend(top.env);
        self
    }

    /// Enable/disable detachment
    pub fn detached(mut self, detached: bool) -> Self {
        self.detached = Some(detached);
        self
    }

    /// Set stdin wiring
    pub fn stdin(mut self, mode: StdioMode) -> Self {
        self.stdin = Some(mode);
        self
    }

    /// Set stdout wiring
    pub fn stdout(mut self, mode: StdioMode) -> Self {
        self.stdout = Some(mode);
        self
    }

    /// Set stderr wiring
    pub fn stderr(mut self, mode: StdioMode) -> Self {
        self.stderr = Some(mode);
        self
    }

    /// Set window-visibility hint
    pub fn hide_window(mut self, hide: bool) -> Self {
        self.hide_window = Some(hide);
        self
    }

    /// Set working directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults() {
        let config = SpawnConfig::default();
        assert!(config.detached);
        assert_eq!(config.stdin, StdioMode::Ignore);
        assert_eq!(config.stdout, StdioMode::Piped);
        assert_eq!(config.stderr, StdioMode::Piped);
        assert!(config.hide_window);
        assert!(config.captures_output());
    }

    #[test]
    fn test_explicit_disable_wins() {
        let overrides = SpawnOverrides::new()
            .detached(false)
            .stdout(StdioMode::Ignore)
            .stderr(StdioMode::Ignore);
        let config = SpawnConfig::from_overrides(&overrides);
        assert!(!config.detached);
        assert!(!config.captures_output());
    }

    #[test]
    fn test_layer_merges_env_key_by_key() {
        let base = SpawnOverrides::new().env("A", "1").env("B", "1");
        let top = SpawnOverrides::new().env("B", "2").working_dir("/tmp");
        let merged = base.layer(top);
        assert_eq!(merged.env.get("A").map(String::as_str), Some("1"));
        assert_eq!(merged.env.get("B").map(String::as_str), Some("2"));
        assert_eq!(merged.working_dir, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_deserialize_partial() {
        let overrides: SpawnOverrides = toml::from_str(
            r#"
            detached = false
            stdin = "piped"
            [env]
            RUST_LOG = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(overrides.detached, Some(false));
        assert_eq!(overrides.stdin, Some(StdioMode::Piped));
        assert_eq!(overrides.stdout, None);
        assert_eq!(overrides.env.len(), 1);
    }

    fn stdio_strategy() -> impl Strategy<Value = Option<StdioMode>> {
        prop_oneof![
            Just(None),
            Just(Some(StdioMode::Ignore)),
            Just(Some(StdioMode::Piped)),
        ]
    }

    proptest! {
        #[test]
        fn prop_top_layer_wins(
            base_detached in proptest::option::of(any::<bool>()),
            top_detached in proptest::option::of(any::<bool>()),
            base_stdout in stdio_strategy(),
            top_stdout in stdio_strategy(),
        ) {
            let base = SpawnOverrides { detached: base_detached, stdout: base_stdout, ..Default::default() };
            let top = SpawnOverrides { detached: top_detached, stdout: top_stdout, ..Default::default() };
            let config = SpawnConfig::from_overrides(&base.layer(top));

            prop_assert_eq!(config.detached, top_detached.or(base_detached).unwrap_or(true));
            prop_assert_eq!(config.stdout, top_stdout.or(base_stdout).unwrap_or(StdioMode::Piped));
        }
    }
}
