// src/engine/mod.rs

//! Event types and the debouncing stage.
//!
//! Raw filesystem events flow in from the event loop, are coalesced by the
//! debouncer and leave as one [`LogicalChange`] per burst, which the
//! process supervisor turns into exactly one command run.
//!
//! The pure, clock-injected state machine lives in [`core`]; the async
//! shell that owns the timer is in [`debouncer`].

use std::path::PathBuf;

/// What happened to a path, as reported by the change source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
    Renamed,
}

/// A single notification: one path, one kind of change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl RawEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Why a run was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// The run at startup, before any change was observed.
    Startup,
    /// A debounced burst of filesystem events.
    FileWatch,
}

/// A coalesced change: the signal that triggers exactly one command run.
///
/// The command itself is fixed; `changes` is kept for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalChange {
    pub reason: TriggerReason,
    /// Distinct `(path, kind)` pairs in arrival order.
    pub changes: Vec<RawEvent>,
    /// Number of raw events folded into this change, duplicates included.
    pub event_count: usize,
}

impl LogicalChange {
    pub fn startup() -> Self {
        Self {
            reason: TriggerReason::Startup,
            changes: Vec::new(),
            event_count: 0,
        }
    }

    /// Distinct paths touched by this change.
    pub fn paths(&self) -> Vec<&PathBuf> {
        let mut out: Vec<&PathBuf> = Vec::new();
        for change in &self.changes {
            if !out.contains(&&change.path) {
                out.push(&change.path);
            }
        }
        out
    }
}

pub mod core;
pub mod debouncer;

pub use self::core::DebounceCore;
pub use debouncer::spawn_debouncer;
pub use crate::types::DebounceMode;
