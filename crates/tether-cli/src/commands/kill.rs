// Kill a process tree by PID

use tether_process::default_terminator;
use tracing::info;

use super::Command;
use crate::error::{CliError, CliResult};
use crate::output;

/// Tree-kill an arbitrary PID with the platform terminator
pub struct KillCommand {
    pid: u32,
}

impl KillCommand {
    pub fn new(pid: u32) -> Self {
        Self { pid }
    }
}

#[async_trait::async_trait]
impl Command for KillCommand {
    async fn execute(&self) -> CliResult<i32> {
        info!(pid = %self.pid, "Attempting to kill process tree");
        default_terminator()
            .terminate_tree(self.pid)
            .map_err(|e| CliError::Process(e.to_string()))?;

        output::print_success(&format!("Killed process tree {}", self.pid));
        Ok(0)
    }
}
