// src/watch/event_loop.rs

//! The long-running loop between the change source and the debouncer.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{ChangeKind, RawEvent};
use crate::fs::FileSystem;
use crate::watch::exclude::ExcludeSet;
use crate::watch::patterns::walk_tree;
use crate::watch::registry::WatchRegistry;
use crate::watch::source::ChangeSource;

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub received: usize,
    pub excluded: usize,
    /// Events for paths the watch set does not cover, such as siblings of
    /// a watched file.
    pub unwatched: usize,
    pub forwarded: usize,
    pub subscribed_later: usize,
}

/// Why the loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Shutdown,
    SourceClosed,
    DebouncerGone,
}

/// Everything the loop needs besides the registry it drives.
pub struct EventLoop {
    exclude: Arc<ExcludeSet>,
    fs: Arc<dyn FileSystem>,
    recursive: bool,
    out: mpsc::UnboundedSender<RawEvent>,
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("recursive", &self.recursive)
            .finish_non_exhaustive()
    }
}

impl EventLoop {
    pub fn new(
        exclude: Arc<ExcludeSet>,
        fs: Arc<dyn FileSystem>,
        recursive: bool,
        out: mpsc::UnboundedSender<RawEvent>,
    ) -> Self {
        Self {
            exclude,
            fs,
            recursive,
            out,
        }
    }

    /// Pump events from `registry` until `shutdown` resolves or the source
    /// closes.
    ///
    /// Excluded paths and paths the registry does not cover are dropped
    /// silently; everything else is forwarded to the debouncer without
    /// waiting, so the source keeps being drained while a command runs. Consuming `self` drops the debouncer sender on
    /// return, which is what stops the downstream stages.
    pub async fn run<S, F>(
        self,
        registry: &mut WatchRegistry<S>,
        shutdown: F,
    ) -> (LoopExit, LoopStats)
    where
        S: ChangeSource,
        F: Future<Output = ()>,
    {
        let mut stats = LoopStats::default();
        tokio::pin!(shutdown);

        let exit = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested; no longer accepting change events");
                    break LoopExit::Shutdown;
                }

                event = registry.next_event() => {
                    let Some(event) = event else {
                        warn!("change source closed");
                        break LoopExit::SourceClosed;
                    };
                    stats.received += 1;

                    if self.exclude.is_excluded(&event.path) {
                        debug!(path = ?event.path, kind = ?event.kind, "[skipping] excluded path");
                        stats.excluded += 1;
                        continue;
                    }

                    if !registry.covers(&event.path) {
                        debug!(path = ?event.path, "[skipping] not in the watch set");
                        stats.unwatched += 1;
                        continue;
                    }

                    stats.subscribed_later += self.follow_new_directory(registry, &event);

                    debug!(path = ?event.path, kind = ?event.kind, "path has changed");
                    if self.out.send(event).is_err() {
                        warn!("debouncer is gone; stopping event loop");
                        break LoopExit::DebouncerGone;
                    }
                    stats.forwarded += 1;
                }
            }
        };

        debug!(?exit, ?stats, "event loop finished");
        (exit, stats)
    }

    /// Watch a freshly created directory and every directory already
    /// inside it (`mkdir -p`, checkouts and copies create whole trees before
    /// the first event is handled). Returns how many were added.
    fn follow_new_directory<S: ChangeSource>(
        &self,
        registry: &mut WatchRegistry<S>,
        event: &RawEvent,
    ) -> usize {
        if !self.recursive || event.kind != ChangeKind::Created {
            return 0;
        }
        if !self.fs.is_dir(&event.path) || self.fs.is_symlink(&event.path) {
            return 0;
        }

        let nested = walk_tree(self.fs.as_ref(), &event.path, None)
            .into_iter()
            .filter(|p| self.fs.is_dir(p) && !self.fs.is_symlink(p))
            .filter(|p| !self.exclude.is_excluded(p));

        let mut added = 0;
        for dir in std::iter::once(event.path.clone()).chain(nested) {
            match registry.watch_dir(&dir) {
                Ok(true) => added += 1,
                Ok(false) => {}
                Err(err) => warn!(path = ?dir, error = %err, "failed to watch new directory"),
            }
        }
        added
    }
}
