// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, Parser, ValueEnum};

use crate::types::{BusyPolicy, DebounceMode};

/// Command-line arguments for `relive`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "relive",
    version,
    about = "Watch files and re-run a command whenever they change.",
    long_about = None
)]
pub struct CliArgs {
    /// Paths or glob patterns to watch. `.` means the working directory.
    ///
    /// May be repeated or given as a comma-separated list.
    #[arg(short = 'p', long = "patterns", value_name = "PATTERN", value_delimiter = ',')]
    pub patterns: Vec<String>,

    /// Shell command to run when a change is detected.
    #[arg(short = 'c', long = "command", value_name = "CMD")]
    pub command: Option<String>,

    /// Paths, names or glob patterns to ignore.
    ///
    /// A bare name such as `node_modules` ignores that component anywhere in
    /// the tree. Added on top of the built-in defaults.
    #[arg(short = 'e', long = "exclude", value_name = "PATTERN", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Print diagnostic output (process id, expanded pattern lists).
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Also watch the current working directory.
    #[arg(short = 'w', long = "watchcur")]
    pub watch_cwd: bool,

    /// Recurse into matched directories (default: true).
    #[arg(short = 'r', long, value_name = "BOOL", action = ArgAction::Set)]
    pub recursive: Option<bool>,

    /// Optional TOML file providing defaults for every flag above.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Quiet period in milliseconds used to coalesce bursts of events.
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Whether new events reset the quiet period (`trailing`) or not (`fixed`).
    #[arg(long, value_enum, value_name = "MODE")]
    pub debounce_mode: Option<DebounceMode>,

    /// What to do when a change arrives while the command is still running.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub on_busy: Option<BusyPolicy>,

    /// How long to wait after asking the command to stop before killing it.
    #[arg(long, value_name = "MS")]
    pub kill_timeout_ms: Option<u64>,

    /// Do not run the command once at startup.
    #[arg(long)]
    pub no_initial_run: bool,

    /// Do not add the built-in exclusions (.git, node_modules, vendor, ...).
    #[arg(long)]
    pub no_default_excludes: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RELIVE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve config and expand patterns, print them, but don't watch.
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

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

/// One-line usage string, printed alongside fatal startup errors.
pub fn usage() -> String {
    CliArgs::command().render_usage().to_string()
}
