// src/watch/source.rs

//! The change-notification capability consumed by the watch registry.
//!
//! [`ChangeSource`] hides the OS mechanism. The production implementation,
//! [`NotifySource`], wraps `notify`'s recommended watcher (inotify, FSEvents,
//! ReadDirectoryChangesW or kqueue depending on the platform); tests plug in
//! a channel-driven fake.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{ChangeKind, RawEvent};
use crate::errors::{ReliveError, Result};

/// Abstract source of filesystem change notifications.
///
/// One source covers many paths. It is owned and driven by a single task;
/// nothing else may touch it concurrently.
pub trait ChangeSource: Send {
    /// Start receiving notifications for `path`. Directories report
    /// changes to their direct children.
    fn subscribe(&mut self, path: &Path) -> Result<()>;

    /// Wait for the next event. `None` means the source is closed.
    fn next_event(&mut self) -> Pin<Box<dyn Future<Output = Option<RawEvent>> + Send + '_>>;

    /// Release the underlying OS resources.
    fn close(&mut self);
}

/// `notify`-backed change source.
pub struct NotifySource {
    watcher: Option<RecommendedWatcher>,
    events: mpsc::UnboundedReceiver<RawEvent>,
}

impl std::fmt::Debug for NotifySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifySource")
            .field("open", &self.watcher.is_some())
            .finish()
    }
}

impl NotifySource {
    /// Allocate the OS watch handle.
    ///
    /// Fails with `WatchInit` if the platform refuses (e.g. inotify
    /// instance limit reached).
    pub fn open() -> Result<Self> {
        // Channel from the blocking notify callback into the async world.
        let (event_tx, events) = mpsc::unbounded_channel::<RawEvent>();

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for raw in raw_events(event) {
                        if event_tx.send(raw).is_err() {
                            // Receiver gone: the source is being closed.
                            return;
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "file watch error");
                }
            },
            Config::default(),
        )
        .map_err(|e| ReliveError::WatchInit(e.to_string()))?;

        Ok(Self {
            watcher: Some(watcher),
            events,
        })
    }
}

impl ChangeSource for NotifySource {
    fn subscribe(&mut self, path: &Path) -> Result<()> {
        let watcher = self
            .watcher
            .as_mut()
            .ok_or_else(|| ReliveError::WatchInit("change source already closed".to_string()))?;
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| ReliveError::WatchInit(format!("watching {:?}: {e}", path)))
    }

    fn next_event(&mut self) -> Pin<Box<dyn Future<Output = Option<RawEvent>> + Send + '_>> {
        Box::pin(self.events.recv())
    }

    fn close(&mut self) {
        if self.watcher.take().is_some() {
            debug!("notify watcher released");
        }
        self.events.close();
    }
}

/// Translate a `notify` event into zero or more raw events.
///
/// Access notifications (open, read, close-after-read) are not changes and
/// are dropped here, so a command that merely reads watched files cannot
/// retrigger itself.
pub fn raw_events(event: Event) -> Vec<RawEvent> {
    let Some(kind) = change_kind(&event.kind) else {
        return Vec::new();
    };
    event
        .paths
        .into_iter()
        .map(|path| RawEvent::new(path, kind))
        .collect()
}

fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Renamed),
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Any => Some(ChangeKind::Modified),
        EventKind::Access(_) | EventKind::Other => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind};
    use std::path::PathBuf;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut e = Event::new(kind);
        for p in paths {
            e = e.add_path(PathBuf::from(p));
        }
        e
    }

    #[test]
    fn access_events_are_dropped() {
        let e = event(EventKind::Access(AccessKind::Any), &["/p/a"]);
        assert!(raw_events(e).is_empty());
    }

    #[test]
    fn kinds_are_mapped() {
        let created = raw_events(event(EventKind::Create(CreateKind::File), &["/p/a"]));
        assert_eq!(created, vec![RawEvent::new("/p/a", ChangeKind::Created)]);

        let modified = raw_events(event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/p/a"],
        ));
        assert_eq!(modified[0].kind, ChangeKind::Modified);

        let removed = raw_events(event(EventKind::Remove(RemoveKind::File), &["/p/a"]));
        assert_eq!(removed[0].kind, ChangeKind::Removed);
    }

    #[test]
    fn rename_reports_every_path() {
        let e = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/p/old", "/p/new"],
        );
        let raws = raw_events(e);
        assert_eq!(raws.len(), 2);
        assert!(raws.iter().all(|r| r.kind == ChangeKind::Renamed));
    }

    #[test]
    fn rename_target_counts_as_created() {
        let e = event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &["/p/new"]);
        assert_eq!(raw_events(e)[0].kind, ChangeKind::Created);
    }
}
