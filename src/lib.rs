//! Shared helpers for the cross-crate scenario tests in `tests/`

use std::time::Duration;

/// Poll `done` every 20ms for up to `timeout`
pub async fn eventually(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if done() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// True once `pid` is absent from the process table or is an unreaped zombie
#[cfg(unix)]
pub fn pid_gone(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return true;
    };
    if kill(Pid::from_raw(raw), None).is_err() {
        return true;
    }
    is_zombie(pid)
}

#[cfg(unix)]
fn is_zombie(pid: u32) -> bool {
    // Field 3 of /proc/<pid>/stat, after the parenthesised command name
    std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .ok()
        .and_then(|stat| {
            stat.rsplit_once(')')
                .map(|(_, rest)| rest.trim_start().starts_with('Z'))
        })
        .unwrap_or(false)
}

/// Kills a process group when dropped, so failing tests leave no orphans
#[cfg(unix)]
pub struct GroupGuard {
    pgid: u32,
}

#[cfg(unix)]
impl GroupGuard {
    pub fn new(pgid: u32) -> Self {
        Self { pgid }
    }
}

#[cfg(unix)]
impl Drop for GroupGuard {
    fn drop(&mut self) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Ok(raw) = i32::try_from(self.pgid) {
            let _ = killpg(Pid::from_raw(raw), Signal::SIGKILL);
        }
    }
}
