//! Error types for process handles

use std::io;
use thiserror::Error;

/// Process lifecycle errors
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Rejected before reaching the OS (e.g. empty command)
    #[error("Invalid process configuration: {0}")]
    InvalidConfig(String),

    /// The OS refused to create the process
    #[error("Failed to spawn process: {0}")]
    SpawnFailed(#[source] io::Error),

    /// Process object was created but no identifier was assigned
    #[error("Spawned process has no PID")]
    MissingPid,

    /// No async runtime reactor available to drive the process
    #[error("No async runtime available to spawn process")]
    NoRuntime,

    /// Asynchronous error reported by the process after creation
    #[error("Process runtime error: {0}")]
    Runtime(#[source] io::Error),

    /// Failed to deliver the termination request
    #[error("Failed to kill process tree (PID: {pid}): {reason}")]
    KillFailed { pid: u32, reason: String },

    /// Liveness probe could not be issued
    #[error("Failed to probe process (PID: {pid}): {reason}")]
    ProbeFailed { pid: u32, reason: String },
}

/// Result type for process operations
pub type Result<T> = std::result::Result<T, ProcessError>;
