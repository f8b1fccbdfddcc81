//! Command-line interface for dubflow
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Transcribe, translate and re-voice media objects
#[derive(Parser, Debug)]
#[command(
    name = "dubflow",
    version,
    about = "Transcribe, translate and re-voice media objects"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: stage progress, -vv: full diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Parse a duration string.
///
/// Supports any duration format accepted by `humantime`: bare numbers (seconds),
/// single-unit (`30s`, `5m`), and compound (`1m30s`).
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline once for a single object
    Run {
        /// Bucket holding the source media
        bucket: String,

        /// Object key of the source media (URL-encoded keys are decoded)
        key: String,

        /// Event time of the triggering notification; part of the run id
        #[arg(long, value_name = "TIME")]
        event_time: Option<String>,

        /// Overall run deadline (default from config: 5m). Examples: 90s, 5m
        #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
        timeout: Option<Duration>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read notifications from stdin (one JSON document per line) and run them
    Listen {
        /// Print reports as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration (file, defaults and environment)
    Show,
    /// Print the configuration file path
    Path,
}
