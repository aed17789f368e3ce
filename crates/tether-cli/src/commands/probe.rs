// Probe a PID for liveness

use tether_process::{probe_pid, ProcessStatus};

use super::Command;
use crate::error::{CliError, CliResult};
use crate::output::OutputStyle;

/// Print whether a PID is alive; exit code 0 iff running
pub struct ProbeCommand {
    pid: u32,
}

impl ProbeCommand {
    pub fn new(pid: u32) -> Self {
        Self { pid }
    }
}

#[async_trait::async_trait]
impl Command for ProbeCommand {
    async fn execute(&self) -> CliResult<i32> {
        let alive = probe_pid(self.pid).map_err(|e| CliError::Process(e.to_string()))?;
        let status = if alive {
            ProcessStatus::Running
        } else {
            ProcessStatus::NotRunning
        };

        println!("{}", OutputStyle::plain().status(status));
        Ok(if alive { 0 } else { 1 })
    }
}
