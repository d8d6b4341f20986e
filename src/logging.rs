// Logging system for polyver
use std::io::{self, IsTerminal};
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::Result;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: Level,
    /// Output format (pretty for terminals, json for programmatic use)
    pub format: LogFormat,
    /// Color output configuration
    pub color: ColorConfig,
    /// Whether to show targets (module names)
    pub show_targets: bool,
    /// Whether to show timestamps
    pub show_timestamps: bool,
}

/// Log output format options
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Pretty output for terminals
    Pretty,
    /// JSON output for programmatic use
    Json,
    /// Compact format for structured logging
    Compact,
}

/// Color output configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ColorConfig {
    /// Automatically detect if colors should be used
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            color: ColorConfig::Auto,
            show_targets: false,
            show_timestamps: false,
        }
    }
}

impl LogConfig {
    /// Create logging configuration from verbosity flags
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        let level = if quiet {
            Level::ERROR
        } else if verbose {
            Level::DEBUG
        } else {
            Level::INFO
        };

        Self {
            level,
            ..Self::default()
        }
    }

    /// Check if colors should be used based on configuration and terminal
    pub fn should_use_colors(&self) -> bool {
        match self.color {
            ColorConfig::Always => true,
            ColorConfig::Never => false,
            ColorConfig::Auto => {
                io::stderr().is_terminal()
                    && std::env::var("TERM").map_or(true, |term| term != "dumb")
                    && std::env::var("NO_COLOR").is_err()
            }
        }
    }
}

/// Initialize the logging system with the given configuration
pub fn init_logging(config: LogConfig) -> Result<()> {
    let env_filter = EnvFilter::new(format!("polyver={}", config.level));

    let builder = fmt()
        .with_env_filter(env_filter)
        .with_target(config.show_targets)
        .with_ansi(config.should_use_colors());

    match (config.format, config.show_timestamps) {
        (LogFormat::Pretty, true) => builder.init(),
        (LogFormat::Pretty, false) => builder.without_time().init(),
        (LogFormat::Json, true) => builder.json().init(),
        (LogFormat::Json, false) => builder.json().without_time().init(),
        (LogFormat::Compact, true) => builder.compact().init(),
        (LogFormat::Compact, false) => builder.compact().without_time().init(),
    }

    Ok(())
}

/// Logging utilities for common operations
pub mod utils {
    use std::path::Path;
    use tracing::{debug, error, info, span, Level, Span};

    /// Create a span for a verification operation
    pub fn verification_span(operation: &str, language: &str) -> Span {
        span!(Level::INFO, "verification", operation = %operation, language = %language)
    }

    /// Create a span for git operations
    pub fn git_operation_span(operation: &str, path: &Path) -> Span {
        span!(Level::DEBUG, "git_operation", operation = %operation, path = %path.display())
    }

    /// Create a span for a deployment workflow step
    pub fn workflow_step_span(step: &str) -> Span {
        span!(Level::INFO, "workflow_step", step = %step)
    }

    /// Log tool invocation start
    pub fn log_tool_start(program: &str, working_dir: &Path) {
        debug!(
            program = %program,
            working_dir = %working_dir.display(),
            "Spawning external tool"
        );
    }

    /// Log tool invocation completion
    pub fn log_tool_completion(program: &str, exit_code: Option<i32>, duration_ms: u128) {
        info!(
            program = %program,
            exit_code = exit_code,
            duration_ms = duration_ms,
            "External tool finished"
        );
    }

    /// Log workflow step completion
    pub fn log_step_outcome(step: &str, outcome: &str, detail: Option<&str>) {
        if outcome == "failed" {
            error!(step = %step, detail = detail, "Workflow step failed");
        } else {
            info!(step = %step, outcome = %outcome, "Workflow step recorded");
        }
    }
}
