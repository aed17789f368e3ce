//! # tether-process
//!
//! **Purpose**: Lifecycle handles for detached child processes
//!
//! Launches a process, captures its combined stdout/stderr, answers "is it
//! still alive" without trusting stale exit notifications, and kills the whole
//! process tree on request.
//!
//! ## Features
//!
//! - **Never-failing spawn**: spawn errors are recorded on the handle, not raised
//! - **Output Capture**: stdout and stderr merged into one buffer in arrival order
//! - **Liveness Probe**: zero-effect OS query that self-corrects stale state
//! - **Process Tree Kill**: process groups on Unix, task trees on Windows, behind
//!   the swappable [`PlatformTerminator`] trait
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tether_process::{ProcessHandle, SpawnOverrides};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let handle = ProcessHandle::spawn("rust-analyzer", ["--stdio"], SpawnOverrides::new());
//!
//! if let Some(err) = handle.error() {
//!     eprintln!("spawn failed: {err}");
//! }
//!
//! println!("{} ({:?})", handle.status(), handle.pid());
//! print!("{}", handle.output());
//!
//! handle.kill_process();
//! # }
//! ```

mod capture;
pub mod config;
pub mod error;
pub mod handle;
pub mod launcher;
pub mod probe;
pub mod terminator;

pub use capture::StreamKind;
pub use config::{SpawnConfig, SpawnOverrides, StdioMode};
pub use error::{ProcessError, Result};
pub use handle::{KillOutcome, ProcessHandle, ProcessStatus};
pub use launcher::ProcessLauncher;
pub use probe::probe_pid;
pub use terminator::{default_terminator, PlatformTerminator};

#[cfg(unix)]
pub use terminator::UnixGroupTerminator;
#[cfg(windows)]
pub use terminator::WindowsTreeTerminator;
