//! Liveness probing
//!
//! A zero-effect query against a PID. On Unix this is signal 0, which succeeds
//! iff the process table holds the PID and we may signal it. Windows has no
//! equivalent signal, so the process table is queried directly.

use crate::error::{ProcessError, Result};

/// Check whether `pid` is present and signalable
///
/// `Ok(false)` covers both "no such process" and "not permitted".
#[cfg(unix)]
pub fn probe_pid(pid: u32) -> Result<bool> {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| ProcessError::ProbeFailed {
        pid,
        reason: "PID out of range".to_string(),
    })?;
    if raw <= 0 {
        // 0 and negatives address process groups, not a single process
        return Err(ProcessError::ProbeFailed {
            pid,
            reason: "not a single-process PID".to_string(),
        });
    }

    match kill(Pid::from_raw(raw), None) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) | Err(Errno::EPERM) => Ok(false),
        Err(e) => Err(ProcessError::ProbeFailed {
            pid,
            reason: e.to_string(),
        }),
    }
}

/// Check whether `pid` is present in the process table
#[cfg(windows)]
pub fn probe_pid(pid: u32) -> Result<bool> {
    use sysinfo::{Pid, System};

    let mut system = System::new();
    Ok(system.refresh_process(Pid::from_u32(pid)))
}
