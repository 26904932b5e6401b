//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use listenscope::config::Overrides;
use std::path::PathBuf;

/// Listenscope - event listener inventory for recorded page loads
///
/// Replays recorded instrumentation sessions, collects every event listener
/// attached to the page, and attributes each to the script that defined it.
///
/// Examples:
///   listenscope sessions/home.json
///   listenscope sessions/ --format json --output listeners.json
///   listenscope sessions/ --dry-run
///   listenscope --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Session files or directories containing `*.json` sessions
    #[arg(value_name = "SESSIONS", required_unless_present = "init_config")]
    pub sessions: Vec<PathBuf>,

    /// Output file path for the report
    ///
    /// Defaults to the configured output (listeners_report.md).
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .listenscope.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Selector enumerating the elements whose listeners are collected
    #[arg(long, value_name = "SELECTOR", env = "LISTENSCOPE_SELECTOR")]
    pub selector: Option<String>,

    /// Object group for remote objects created during a pass
    #[arg(long, value_name = "GROUP")]
    pub object_group: Option<String>,

    /// Maximum listeners listed per pass in Markdown output (0 = all)
    #[arg(long, value_name = "COUNT")]
    pub max_listeners: Option<usize>,

    /// Maximum directory depth when discovering sessions
    #[arg(long, value_name = "DEPTH")]
    pub max_depth: Option<usize>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Exit with code 2 if any pass could not be collected
    #[arg(long)]
    pub fail_on_error: bool,

    /// List discovered sessions without replaying them
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .listenscope.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.sessions.is_empty() {
            return Err("At least one session file or directory is required".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref selector) = self.selector {
            if selector.trim().is_empty() {
                return Err("Selector must not be empty".to_string());
            }
        }

        if let Some(ref group) = self.object_group {
            if group.trim().is_empty() {
                return Err("Object group must not be empty".to_string());
            }
        }

        if self.max_depth == Some(0) {
            return Err("Max depth must be at least 1".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    /// `--quiet` wins over both `--verbose` and the configured default.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Configuration overrides given on the command line.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            element_selector: self.selector.clone(),
            object_group: self.object_group.clone(),
            output: self
                .output
                .as_ref()
                .map(|path| path.to_string_lossy().to_string()),
            max_listeners_per_pass: self.max_listeners,
            verbose: self.verbose,
        }
    }
}
