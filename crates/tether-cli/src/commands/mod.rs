// Command handlers for tether CLI

pub mod config;
pub mod kill;
pub mod probe;
pub mod run;

pub use config::ConfigCommand;
pub use kill::KillCommand;
pub use probe::ProbeCommand;
pub use run::{OutputFollower, RunCommand};

use crate::error::CliResult;

/// Trait for command handlers
#[async_trait::async_trait]
pub trait Command: Send + Sync {
    /// Execute the command, returning the exit code
    async fn execute(&self) -> CliResult<i32>;
}
