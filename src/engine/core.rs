// src/engine/core.rs

//! Pure debounce state machine.
//!
//! Time is passed in by the caller, so every rule here is unit tested
//! without Tokio, channels or sleeps. The async shell
//! (`engine::debouncer`) only feeds events in and sleeps until
//! [`DebounceCore::deadline`].

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::engine::{LogicalChange, RawEvent, TriggerReason};
use crate::types::DebounceMode;

#[derive(Debug)]
pub struct DebounceCore {
    mode: DebounceMode,
    quiet: Duration,
    deadline: Option<Instant>,
    changes: Vec<RawEvent>,
    seen: HashSet<RawEvent>,
    event_count: usize,
}

impl DebounceCore {
    pub fn new(mode: DebounceMode, quiet: Duration) -> Self {
        Self {
            mode,
            quiet,
            deadline: None,
            changes: Vec::new(),
            seen: HashSet::new(),
            event_count: 0,
        }
    }

    /// Record an accepted event observed at `now`.
    ///
    /// The first event of a burst arms the timer. Later events extend it in
    /// `Trailing` mode and leave it alone in `Fixed` mode.
    pub fn push(&mut self, event: RawEvent, now: Instant) {
        self.deadline = match (self.deadline, self.mode) {
            (Some(deadline), DebounceMode::Fixed) => Some(deadline),
            _ => Some(now + self.quiet),
        };

        self.event_count += 1;
        if self.seen.insert(event.clone()) {
            self.changes.push(event);
        }
    }

    /// When the pending change should fire, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Emit the pending change if its deadline has passed, clearing state.
    pub fn poll_fire(&mut self, now: Instant) -> Option<LogicalChange> {
        match self.deadline {
            Some(deadline) if deadline <= now => Some(self.take()),
            _ => None,
        }
    }

    fn take(&mut self) -> LogicalChange {
        self.deadline = None;
        self.seen.clear();
        LogicalChange {
            reason: TriggerReason::FileWatch,
            changes: std::mem::take(&mut self.changes),
            event_count: std::mem::take(&mut self.event_count),
        }
    }
}
