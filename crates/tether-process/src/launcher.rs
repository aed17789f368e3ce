//! Process launcher - applies shared defaults to every launch

use std::sync::Arc;

use tracing::debug;

use crate::{
    config::SpawnOverrides,
    handle::ProcessHandle,
    terminator::{default_terminator, PlatformTerminator},
};

/// Launches [`ProcessHandle`]s with layered default overrides
///
/// Keeps no reference to the handles it creates.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    defaults: SpawnOverrides,
    terminator: Arc<dyn PlatformTerminator>,
}

impl ProcessLauncher {
    /// Create new launcher with no defaults beyond the built-in ones
    pub fn new() -> Self {
        Self::with_defaults(SpawnOverrides::default())
    }

    /// Create launcher whose every launch starts from `defaults`
    pub fn with_defaults(defaults: SpawnOverrides) -> Self {
        Self {
            defaults,
            terminator: default_terminator(),
        }
    }

    /// Replace the termination strategy
    pub fn terminator(mut self, terminator: Arc<dyn PlatformTerminator>) -> Self {
        self.terminator = terminator;
        self
    }

    /// Defaults applied beneath per-launch overrides
    pub fn defaults(&self) -> &SpawnOverrides {
        &self.defaults
    }

    /// Launch a process
    ///
    /// # Examples
    /// ```no_run
    /// use tether_process::{ProcessLauncher, SpawnOverrides};
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let launcher = ProcessLauncher::new();
    /// let handle = launcher.launch("echo", ["hello"], SpawnOverrides::new());
    /// println!("{}", handle.status());
    /// # }
    /// ```
    pub fn launch<I, S>(
        &self,
        command: impl Into<String>,
        args: I,
        overrides: SpawnOverrides,
    ) -> ProcessHandle
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let overrides = self.defaults.clone().layer(overrides);
        let command = command.into();
        debug!(command = %command, overrides = ?overrides, "Launching process");
        ProcessHandle::spawn_with(command, args, overrides, Arc::clone(&self.terminator))
    }
}

impl Default for ProcessLauncher {
    fn default() -> Self {
        Self::new()
    }
}
