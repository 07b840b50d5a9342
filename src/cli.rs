// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `tisf-run`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tisf-run",
    version,
    about = "Clone a repository branch, install its dependencies and run its entry script.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the YAML config file.
    ///
    /// Optional for clap so that a missing path can print our own usage and
    /// exit with status 1 before anything else happens.
    #[arg(value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory under which the `temp/` workspace is created.
    ///
    /// Default: the current working directory.
    #[arg(long, value_name = "PATH")]
    pub base_dir: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TISF_RUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load the config and print the plan, but don't touch the filesystem or
    /// run anything.
    #[arg(long)]
    pub dry_run: bool,
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

/// The two lines printed when no config path is given.
pub const USAGE_LINES: [&str; 2] = [
    "You have to provide the path to config.",
    "Usage: tisf-run <config.yml>",
];

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
