//! Process tree termination strategies
//!
//! - Unix: the detached child leads its own process group, so signalling the
//!   negative PID reaches every descendant still in that group.
//! - Windows: `taskkill /pid <pid> /f /t` walks the descendant tree.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ProcessError, Result};

/// Terminates a process and all of its descendants
pub trait PlatformTerminator: Send + Sync + fmt::Debug {
    /// Forcefully terminate the tree rooted at `pid`
    fn terminate_tree(&self, pid: u32) -> Result<()>;
}

/// Terminator for the platform this binary was built for
pub fn default_terminator() -> Arc<dyn PlatformTerminator> {
    #[cfg(unix)]
    {
        Arc::new(UnixGroupTerminator::new())
    }

    #[cfg(windows)]
    {
        Arc::new(WindowsTreeTerminator::new())
    }
}

/// Signals the whole process group led by the target PID
#[cfg(unix)]
#[derive(Debug, Clone, Copy)]
pub struct UnixGroupTerminator {
    signal: nix::sys::signal::Signal,
}

#[cfg(unix)]
impl UnixGroupTerminator {
    /// Terminator that sends SIGKILL
    pub fn new() -> Self {
        Self {
            signal: nix::sys::signal::Signal::SIGKILL,
        }
    }
}

#[cfg(unix)]
impl Default for UnixGroupTerminator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
impl PlatformTerminator for UnixGroupTerminator {
    fn terminate_tree(&self, pid: u32) -> Result<()> {
        use nix::sys::signal::{kill, killpg};
        use nix::unistd::Pid;

        let raw = i32::try_from(pid)
            .ok()
            .filter(|raw| *raw > 0)
            .ok_or_else(|| ProcessError::KillFailed {
                pid,
                reason: "not a single-process PID".to_string(),
            })?;
        let target = Pid::from_raw(raw);

        match killpg(target, self.signal) {
            Ok(()) => {
                debug!(pid = %pid, signal = %self.signal, "Signalled process group");
                Ok(())
            }
            Err(group_err) => {
                // Not a group leader (spawned without detachment)
                debug!(pid = %pid, error = %group_err, "Group signal failed, signalling process only");
                kill(target, self.signal).map_err(|e| ProcessError::KillFailed {
                    pid,
                    reason: format!("group: {group_err}; process: {e}"),
                })?;
                debug!(pid = %pid, signal = %self.signal, "Signalled process");
                Ok(())
            }
        }
    }
}

/// Kills the descendant tree with `taskkill /f /t`
#[cfg(windows)]
#[derive(Debug, Clone, Default)]
pub struct WindowsTreeTerminator;

#[cfg(windows)]
impl WindowsTreeTerminator {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(windows)]
impl PlatformTerminator for WindowsTreeTerminator {
    fn terminate_tree(&self, pid: u32) -> Result<()> {
        use std::os::windows::process::CommandExt;
        use std::process::{Command, Stdio};

        const CREATE_NO_WINDOW: u32 = 0x0800_0000;

        let taskkill = which::which("taskkill").unwrap_or_else(|_| "taskkill".into());
        let status = Command::new(taskkill)
            .args(["/pid", &pid.to_string(), "/f", "/t"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .creation_flags(CREATE_NO_WINDOW)
            .status()
            .map_err(|e| ProcessError::KillFailed {
                pid,
                reason: e.to_string(),
            })?;

        if status.success() {
            debug!(pid = %pid, "Windows process tree killed");
            Ok(())
        } else {
            Err(ProcessError::KillFailed {
                pid,
                reason: format!("taskkill exited with {status}"),
            })
        }
    }
}
