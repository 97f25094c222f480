// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::CliArgs;
use crate::config::model::{ConfigFile, RawWatchConfig, WatchConfig};
use crate::errors::{ReliveError, Result};

/// Load a configuration file from a given path.
///
/// This only performs TOML deserialization; merging with the CLI and
/// validation happen in [`resolve`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ReliveError::Filesystem {
        path: path.to_path_buf(),
        source,
    })?;

    let config: ConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Resolve the working directory that relative patterns are anchored to.
pub fn working_dir() -> Result<PathBuf> {
    std::env::current_dir().map_err(|source| ReliveError::Filesystem {
        path: PathBuf::from("."),
        source,
    })
}

/// Merge CLI flags over an optional config file and validate the result.
///
/// - Scalars: CLI wins, then the file, then the built-in default.
/// - Boolean switches (`-v`, `-w`) are on if either source turns them on.
/// - `patterns` / `exclude`: file entries first, then CLI entries.
pub fn resolve(args: &CliArgs, file: Option<ConfigFile>, root: PathBuf) -> Result<WatchConfig> {
    let file = file.unwrap_or_default();

    let command = args
        .command
        .clone()
        .or(file.command)
        .unwrap_or_default();

    let mut raw = RawWatchConfig::new(root, command);

    raw.patterns = file.patterns;
    raw.patterns.extend(args.patterns.iter().cloned());
    raw.exclude = file.exclude;
    raw.exclude.extend(args.exclude.iter().cloned());

    raw.verbose = args.verbose || file.verbose.unwrap_or(false);
    raw.watch_cwd = args.watch_cwd || file.watch_cwd.unwrap_or(false);

    if let Some(recursive) = args.recursive.or(file.recursive) {
        raw.recursive = recursive;
    }
    if let Some(ms) = args.debounce_ms.or(file.debounce_ms) {
        raw.debounce_ms = ms;
    }
    if let Some(mode) = args.debounce_mode.or(file.debounce_mode) {
        raw.debounce_mode = mode;
    }
    if let Some(policy) = args.on_busy.or(file.on_busy) {
        raw.on_busy = policy;
    }
    if let Some(ms) = args.kill_timeout_ms.or(file.kill_timeout_ms) {
        raw.kill_timeout_ms = ms;
    }

    raw.initial_run = !args.no_initial_run && file.initial_run.unwrap_or(true);
    raw.default_excludes = !args.no_default_excludes && file.default_excludes.unwrap_or(true);

    WatchConfig::try_from(raw)
}

/// Recommended entry point for the binary: read `--config` if given, anchor
/// everything at the current directory, merge and validate.
pub fn load_and_resolve(args: &CliArgs) -> Result<WatchConfig> {
    let file = match args.config {
        Some(ref path) => Some(load_from_path(path)?),
        None => None,
    };
    resolve(args, file, working_dir()?)
}
