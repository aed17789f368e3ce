// Command routing and dispatch

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tether_config::{ConfigLoader, TetherConfig};
use tether_process::SpawnOverrides;

use crate::commands::*;
use crate::error::{CliError, CliResult};
use crate::logging::{init_logging, VerbosityLevel};

/// Tether - launch, watch and tree-kill detached processes
#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(bin_name = "tether")]
#[command(about = "Launch, watch and tree-kill detached processes")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: <config_dir>/tether/config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Launch a command and follow it until it exits
    #[command(about = "Launch a detached command, stream its output and report its exit")]
    Run {
        /// Keep the child in our process group
        #[arg(long)]
        no_detach: bool,

        /// Working directory for the child
        #[arg(long, value_name = "DIR")]
        cwd: Option<PathBuf>,

        /// Extra environment variable (repeatable)
        #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        env: Vec<(String, String)>,

        /// Kill the process tree after this many seconds
        #[arg(long, value_name = "SECS")]
        kill_after: Option<u64>,

        /// Status/output poll interval in milliseconds
        #[arg(long, value_name = "MS")]
        poll_ms: Option<u64>,

        /// Command and its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
        command: Vec<String>,
    },

    /// Report whether a PID is alive
    #[command(about = "Probe a PID and print Running or Not Running")]
    Probe {
        #[arg(value_name = "PID")]
        pid: u32,
    },

    /// Kill a PID and its descendants
    #[command(about = "Kill a process tree by PID")]
    Kill {
        #[arg(value_name = "PID")]
        pid: u32,
    },

    /// Print the effective configuration
    #[command(about = "Print the effective configuration as TOML")]
    Config,
}

/// Parse `KEY=VALUE`
pub fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

/// Command router
pub struct CommandRouter;

impl CommandRouter {
    /// Parse CLI arguments and route to appropriate handler
    pub async fn route() -> CliResult<i32> {
        let cli = Cli::parse();
        let config = Self::load_config(&cli)?;

        init_logging(
            VerbosityLevel::from_flags(cli.verbose, cli.quiet),
            &config.logging.level,
        );

        Self::execute(&cli, config).await
    }

    fn load_config(cli: &Cli) -> CliResult<TetherConfig> {
        let loader = match &cli.config {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::InvalidArgument {
                        message: format!("config file {} does not exist", path.display()),
                    });
                }
                ConfigLoader::with_path(path)
            }
            None => ConfigLoader::new(),
        };
        Ok(loader.load()?)
    }

    /// Execute a command, returning the process exit code
    pub async fn execute(cli: &Cli, config: TetherConfig) -> CliResult<i32> {
        match &cli.command {
            Commands::Run {
                no_detach,
                cwd,
                env,
                kill_after,
                poll_ms,
                command,
            } => {
                let (program, args) = command.split_first().ok_or_else(|| CliError::InvalidArgument {
                    message: "missing command".to_string(),
                })?;

                let mut overrides = SpawnOverrides::new();
                if *no_detach {
                    overrides = overrides.detached(false);
                }
                if let Some(dir) = cwd {
                    overrides = overrides.working_dir(dir);
                }
                for (key, value) in env {
                    overrides = overrides.env(key, value);
                }

                let poll_ms = poll_ms.unwrap_or(config.runner.poll_interval_ms);
                if poll_ms == 0 {
                    return Err(CliError::InvalidArgument {
                        message: "--poll-ms must be greater than 0".to_string(),
                    });
                }

                let cmd = RunCommand::new(program.clone(), args.to_vec())
                    .with_defaults(config.spawn)
                    .with_overrides(overrides)
                    .with_poll_interval(Duration::from_millis(poll_ms))
                    .with_kill_after(kill_after.or(config.runner.kill_after_secs).map(Duration::from_secs));
                cmd.execute().await
            }
            Commands::Probe { pid } => ProbeCommand::new(*pid).execute().await,
            Commands::Kill { pid } => KillCommand::new(*pid).execute().await,
            Commands::Config => ConfigCommand::new(config).execute().await,
        }
    }
}
