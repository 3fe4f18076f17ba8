// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::tasks::TaskRequest;
use crate::types::Priority;

/// Priority of `--submit` tasks given without one.
pub const DEFAULT_SUBMIT_PRIORITY: Priority = 1;

/// Command-line arguments for `fleetcoord`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fleetcoord",
    version,
    about = "Assign transport tasks to a robot fleet and keep their routes conflict-free.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the fleet config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Fleet.toml")]
    pub config: String,

    /// Path to the topological map (TOML).
    #[arg(long, value_name = "PATH", default_value = "Map.toml")]
    pub map: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FLEETCOORD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate config and map, print a summary, don't run.
    #[arg(long)]
    pub dry_run: bool,

    /// Submit a task at start-up. Repeatable.
    #[arg(long = "submit", value_name = "NODE[:PRIORITY]", value_parser = parse_submission)]
    pub submit: Vec<TaskRequest>,

    /// Exit once every task is finished and all robots are idle.
    #[arg(long)]
    pub exit_when_idle: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Parse `NODE` or `NODE:PRIORITY`.
pub fn parse_submission(s: &str) -> Result<TaskRequest, String> {
    let (node, priority) = match s.rsplit_once(':') {
        Some((node, priority)) => {
            let priority = priority
                .trim()
                .parse::<Priority>()
                .map_err(|e| format!("invalid priority '{priority}': {e}"))?;
            (node.trim(), priority)
        }
        None => (s.trim(), DEFAULT_SUBMIT_PRIORITY),
    };

    if node.is_empty() {
        return Err(format!("missing node in '{s}'"));
    }
    Ok(TaskRequest::new(priority, node).with_payload("cli"))
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
