// Launch a command and follow it until it exits

use std::io::Write;
use std::time::{Duration, Instant};

use tether_process::{KillOutcome, ProcessHandle, ProcessLauncher, SpawnOverrides};
use tracing::{debug, info, warn};

use super::Command;
use crate::error::{CliError, CliResult};
use crate::output;

/// How long to keep draining output after the process is gone
const CLOSE_GRACE: Duration = Duration::from_millis(500);

/// Tracks how much captured output has already been echoed
#[derive(Debug, Default)]
pub struct OutputFollower {
    printed: usize,
}

impl OutputFollower {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output `handle` captured since the previous call
    pub fn advance(&mut self, handle: &ProcessHandle) -> String {
        let fresh = handle.output_since(self.printed);
        self.printed += fresh.len();
        fresh
    }

    /// Bytes of output returned so far
    pub fn printed(&self) -> usize {
        self.printed
    }
}

/// `tether run`
pub struct RunCommand {
    command: String,
    args: Vec<String>,
    defaults: SpawnOverrides,
    overrides: SpawnOverrides,
    poll_interval: Duration,
    kill_after: Option<Duration>,
}

impl RunCommand {
    pub fn new(command: String, args: Vec<String>) -> Self {
        Self {
            command,
            args,
            defaults: SpawnOverrides::default(),
            overrides: SpawnOverrides::default(),
            poll_interval: Duration::from_millis(100),
            kill_after: None,
        }
    }

    /// Configured spawn defaults
    pub fn with_defaults(mut self, defaults: SpawnOverrides) -> Self {
        self.defaults = defaults;
        self
    }

    /// Per-invocation overrides, layered over the defaults
    pub fn with_overrides(mut self, overrides: SpawnOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_kill_after(mut self, limit: Option<Duration>) -> Self {
        self.kill_after = limit;
        self
    }

    fn echo(handle: &ProcessHandle, follower: &mut OutputFollower) -> CliResult<()> {
        let fresh = follower.advance(handle);
        if !fresh.is_empty() {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(fresh.as_bytes())?;
            stdout.flush()?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Command for RunCommand {
    async fn execute(&self) -> CliResult<i32> {
        let launcher = ProcessLauncher::with_defaults(self.defaults.clone());
        let handle = launcher.launch(&self.command, self.args.clone(), self.overrides.clone());

        if let Some(err) = handle.error() {
            return Err(CliError::Process(format!("{}: {}", self.command, err)));
        }
        info!(pid = ?handle.pid(), command = %self.command, "Following process");

        let started = Instant::now();
        let mut follower = OutputFollower::new();
        let mut killed = false;

        loop {
            Self::echo(&handle, &mut follower)?;
            if !handle.status().is_running() {
                break;
            }

            if let Some(limit) = self.kill_after {
                if !killed && started.elapsed() >= limit {
                    warn!(pid = ?handle.pid(), seconds = limit.as_secs(), "Kill timeout reached");
                    match handle.kill_process() {
                        KillOutcome::Failed(e) => output::print_warning(&format!("Kill failed: {}", e)),
                        outcome => debug!(?outcome, "Kill requested"),
                    }
                    killed = true;
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }

        // Pipes can close after the process is gone
        let grace = Instant::now();
        while handle.exit_status().is_none() && grace.elapsed() < CLOSE_GRACE {
            Self::echo(&handle, &mut follower)?;
            tokio::time::sleep(self.poll_interval.min(CLOSE_GRACE)).await;
        }
        Self::echo(&handle, &mut follower)?;

        if let Some(err) = handle.error() {
            output::print_warning(&format!("Process reported an error: {}", err));
        }

        let code = match handle.exit_status() {
            Some(status) => status.code().unwrap_or(1),
            None => 1,
        };
        debug!(code, killed, "Run finished");
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_follower_without_process_is_empty() {
        let handle = ProcessHandle::spawn("/no/such/tether-binary", Vec::<String>::new(), SpawnOverrides::new());
        let mut follower = OutputFollower::new();
        assert_eq!(follower.advance(&handle), "");
        assert_eq!(follower.printed(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_follower_returns_each_byte_once() {
        let handle = ProcessHandle::spawn(
            "sh",
            ["-c", "printf 'ab'; sleep 0.2; printf 'cé'"],
            SpawnOverrides::new(),
        );
        let mut follower = OutputFollower::new();
        let mut echoed = String::new();
        for _ in 0..250 {
            echoed.push_str(&follower.advance(&handle));
            if handle.exit_status().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        echoed.push_str(&follower.advance(&handle));

        assert_eq!(echoed, "abcé");
        assert_eq!(follower.printed(), "abcé".len());
        assert_eq!(follower.advance(&handle), "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_returns_exit_code() {
        let cmd = RunCommand::new("sh".to_string(), vec!["-c".to_string(), "exit 7".to_string()])
            .with_poll_interval(Duration::from_millis(10));
        assert_eq!(cmd.execute().await.unwrap(), 7);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_kills_after_limit() {
        let started = Instant::now();
        let cmd = RunCommand::new("sleep".to_string(), vec!["30".to_string()])
            .with_poll_interval(Duration::from_millis(10))
            .with_kill_after(Some(Duration::from_millis(100)));

        assert_eq!(cmd.execute().await.unwrap(), 1);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_run_missing_executable_is_error() {
        let cmd = RunCommand::new("/no/such/tether-binary".to_string(), Vec::new());
        assert!(matches!(cmd.execute().await, Err(CliError::Process(_))));
    }
}
