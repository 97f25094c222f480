// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{BusyPolicy, DebounceMode};

pub const DEFAULT_DEBOUNCE_MS: u64 = 100;
pub const DEFAULT_KILL_TIMEOUT_MS: u64 = 2_000;

/// Optional configuration file, read from TOML.
///
/// Every key mirrors a CLI flag:
///
/// ```toml
/// command = "go run ."
/// patterns = ["src/**/*.go", "go.mod"]
/// exclude = ["tmp"]
/// recursive = true
/// debounce_ms = 200
/// debounce_mode = "trailing"
/// on_busy = "restart"
/// ```
///
/// All keys are optional; unknown keys are rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub patterns: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub command: Option<String>,

    #[serde(default)]
    pub verbose: Option<bool>,

    #[serde(default)]
    pub watch_cwd: Option<bool>,

    #[serde(default)]
    pub recursive: Option<bool>,

    #[serde(default)]
    pub debounce_ms: Option<u64>,

    #[serde(default)]
    pub debounce_mode: Option<DebounceMode>,

    #[serde(default)]
    pub on_busy: Option<BusyPolicy>,

    #[serde(default)]
    pub kill_timeout_ms: Option<u64>,

    #[serde(default)]
    pub initial_run: Option<bool>,

    /// Whether the built-in exclusions (`.git`, `node_modules`, ...) apply.
    #[serde(default)]
    pub default_excludes: Option<bool>,
}

/// Fully merged, not yet validated settings.
///
/// Produced by [`crate::config::loader::resolve`]; turned into a
/// [`WatchConfig`] through `TryFrom`, which is where validation happens.
#[derive(Debug, Clone)]
pub struct RawWatchConfig {
    pub root: PathBuf,
    pub patterns: Vec<String>,
    pub exclude: Vec<String>,
    pub command: String,
    pub verbose: bool,
    pub watch_cwd: bool,
    pub recursive: bool,
    pub debounce_ms: u64,
    pub debounce_mode: DebounceMode,
    pub on_busy: BusyPolicy,
    pub kill_timeout_ms: u64,
    pub initial_run: bool,
    pub default_excludes: bool,
}

impl RawWatchConfig {
    /// Settings with every default applied and nothing to watch yet.
    pub fn new(root: impl Into<PathBuf>, command: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            patterns: Vec::new(),
            exclude: Vec::new(),
            command: command.into(),
            verbose: false,
            watch_cwd: false,
            recursive: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            debounce_mode: DebounceMode::default(),
            on_busy: BusyPolicy::default(),
            kill_timeout_ms: DEFAULT_KILL_TIMEOUT_MS,
            initial_run: true,
            default_excludes: true,
        }
    }
}

/// Immutable configuration shared by the expander, event loop and
/// supervisor for the whole lifetime of the process.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Absolute working directory that relative patterns resolve against.
    pub root: PathBuf,
    pub patterns: Vec<String>,
    pub exclude: Vec<String>,
    pub command: String,
    pub verbose: bool,
    pub watch_cwd: bool,
    pub recursive: bool,
    pub debounce: Duration,
    pub debounce_mode: DebounceMode,
    pub on_busy: BusyPolicy,
    pub kill_timeout: Duration,
    pub initial_run: bool,
    pub default_excludes: bool,
}

impl WatchConfig {
    /// Only called from `TryFrom<RawWatchConfig>` once validation passed.
    pub(crate) fn new_unchecked(raw: RawWatchConfig) -> Self {
        Self {
            root: raw.root,
            patterns: raw.patterns,
            exclude: raw.exclude,
            command: raw.command.trim().to_string(),
            verbose: raw.verbose,
            watch_cwd: raw.watch_cwd,
            recursive: raw.recursive,
            debounce: Duration::from_millis(raw.debounce_ms),
            debounce_mode: raw.debounce_mode,
            on_busy: raw.on_busy,
            kill_timeout: Duration::from_millis(raw.kill_timeout_ms),
            initial_run: raw.initial_run,
            default_excludes: raw.default_excludes,
        }
    }
}
