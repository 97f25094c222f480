#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use relive::config::{RawWatchConfig, WatchConfig};
use relive::types::{BusyPolicy, DebounceMode};

/// Builder for `WatchConfig` to simplify test setup.
///
/// Starts from the normal defaults but with a short debounce and no
/// initial run, which is what most pipeline tests want.
pub struct WatchConfigBuilder {
    raw: RawWatchConfig,
}

impl WatchConfigBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let mut raw = RawWatchConfig::new(root, "true");
        raw.debounce_ms = 20;
        raw.initial_run = false;
        raw.default_excludes = false;
        Self { raw }
    }

    pub fn command(mut self, cmd: &str) -> Self {
        self.raw.command = cmd.to_string();
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.raw.patterns.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.raw.exclude.push(pattern.to_string());
        self
    }

    pub fn watch_cwd(mut self, val: bool) -> Self {
        self.raw.watch_cwd = val;
        self
    }

    pub fn recursive(mut self, val: bool) -> Self {
        self.raw.recursive = val;
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.raw.debounce_ms = ms;
        self
    }

    pub fn debounce_mode(mut self, mode: DebounceMode) -> Self {
        self.raw.debounce_mode = mode;
        self
    }

    pub fn on_busy(mut self, policy: BusyPolicy) -> Self {
        self.raw.on_busy = policy;
        self
    }

    pub fn kill_timeout_ms(mut self, ms: u64) -> Self {
        self.raw.kill_timeout_ms = ms;
        self
    }

    pub fn initial_run(mut self, val: bool) -> Self {
        self.raw.initial_run = val;
        self
    }

    pub fn default_excludes(mut self, val: bool) -> Self {
        self.raw.default_excludes = val;
        self
    }

    pub fn raw(self) -> RawWatchConfig {
        self.raw
    }

    pub fn build(self) -> WatchConfig {
        WatchConfig::try_from(self.raw).expect("Failed to build valid config from builder")
    }
}

/// Create every path in `entries` under `root`.
///
/// Entries ending in `/` become directories, everything else an empty
/// file (parents are created as needed).
pub fn write_tree(root: &Path, entries: &[&str]) {
    for entry in entries {
        let path = root.join(entry.trim_end_matches('/'));
        if entry.ends_with('/') {
            fs::create_dir_all(&path).expect("create dir");
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create parent dir");
            }
            fs::write(&path, b"").expect("write file");
        }
    }
}
