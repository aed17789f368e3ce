// CLI error types

use tether_config::ConfigError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Process error: {0}")]
    Process(String),
}

impl CliError {
    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            CliError::InvalidArgument { message } => {
                format!("Invalid argument: {}\n\nRun 'tether --help' for usage information.", message)
            }
            CliError::Io(e) => format!("I/O failed: {}", e),
            CliError::Config(e) => {
                format!("{}\n\nRun 'tether config' to inspect the effective configuration.", e)
            }
            CliError::Process(msg) => format!("Process error: {}", msg),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
