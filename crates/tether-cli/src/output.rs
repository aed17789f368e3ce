// Output formatting and styling

use colored::Colorize;
use tether_process::ProcessStatus;

/// Output styling configuration
pub struct OutputStyle {
    pub use_colors: bool,
}

impl Default for OutputStyle {
    fn default() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stderr),
        }
    }
}

impl OutputStyle {
    /// Style without colors, regardless of the terminal
    pub fn plain() -> Self {
        Self { use_colors: false }
    }

    /// Format success message
    pub fn success(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "✓".green().bold(), msg)
        } else {
            format!("✓ {}", msg)
        }
    }

    /// Format error message
    pub fn error(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "✗".red().bold(), msg)
        } else {
            format!("✗ {}", msg)
        }
    }

    /// Format warning message
    pub fn warning(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "⚠".yellow(), msg)
        } else {
            format!("⚠ {}", msg)
        }
    }

    /// Format a process status
    pub fn status(&self, status: ProcessStatus) -> String {
        if !self.use_colors {
            return status.to_string();
        }
        match status {
            ProcessStatus::Running => status.as_str().green().to_string(),
            ProcessStatus::NotRunning => status.as_str().red().to_string(),
        }
    }
}

pub fn print_success(msg: &str) {
    let style = OutputStyle::default();
    eprintln!("{}", style.success(msg));
}

pub fn print_error(msg: &str) {
    let style = OutputStyle::default();
    eprintln!("{}", style.error(msg));
}

pub fn print_warning(msg: &str) {
    let style = OutputStyle::default();
    eprintln!("{}", style.warning(msg));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_messages() {
        let style = OutputStyle::plain();
        assert_eq!(style.success("done"), "✓ done");
        assert_eq!(style.error("failed"), "✗ failed");
        assert_eq!(style.warning("careful"), "⚠ careful");
    }

    #[test]
    fn test_plain_status_uses_literal_names() {
        let style = OutputStyle::plain();
        assert_eq!(style.status(ProcessStatus::Running), "Running");
        assert_eq!(style.status(ProcessStatus::NotRunning), "Not Running");
    }
}
