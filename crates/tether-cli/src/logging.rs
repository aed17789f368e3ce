// Logging and verbosity control

use tracing::Level;

/// Verbosity requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VerbosityLevel {
    /// Quiet mode - errors only
    Quiet,
    /// Normal mode - configured level
    Normal,
    /// Verbose mode - debug output
    Verbose,
}

impl VerbosityLevel {
    /// Resolve CLI flags; quiet wins over verbose
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            VerbosityLevel::Quiet
        } else if verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Parse a configured level name, falling back to INFO
pub fn parse_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Effective max level for the given verbosity and configured level
pub fn effective_level(verbosity: VerbosityLevel, configured: &str) -> Level {
    match verbosity {
        VerbosityLevel::Quiet => Level::ERROR,
        VerbosityLevel::Normal => parse_level(configured),
        VerbosityLevel::Verbose => Level::DEBUG.max(parse_level(configured)),
    }
}

/// Install the stderr subscriber; later calls are ignored
pub fn init_logging(verbosity: VerbosityLevel, configured: &str) {
    let level = effective_level(verbosity, configured);
    let debug = level >= Level::DEBUG;

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(debug)
        .with_writer(std::io::stderr)
        .try_init();
}
