// src/watch/registry.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::engine::RawEvent;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::watch::exclude::ExcludeSet;
use crate::watch::source::ChangeSource;

/// Owns the change source, its subscriptions and the scope of paths whose
/// events matter.
///
/// Only directories are subscribed. A watched file is covered through its
/// parent directory, so replacing it (write to a temp file, rename over the
/// original) does not lose the watch.
///
/// The source is closed exactly once: explicitly through [`close`], or on
/// drop if an early return skipped that.
///
/// [`close`]: WatchRegistry::close
pub struct WatchRegistry<S: ChangeSource> {
    source: Option<S>,
    /// Paths subscribed on the source.
    subscribed: HashSet<PathBuf>,
    /// Watched directories: events for them and their direct children count.
    dirs: HashSet<PathBuf>,
    /// Watched files: events count for exactly these paths.
    files: HashSet<PathBuf>,
}

impl<S: ChangeSource> std::fmt::Debug for WatchRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("open", &self.source.is_some())
            .field("subscribed", &self.subscribed.len())
            .field("dirs", &self.dirs.len())
            .field("files", &self.files.len())
            .finish()
    }
}

/// How a watch set maps onto directory subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionPlan {
    /// Directories to subscribe, in watch set order.
    pub subscriptions: Vec<PathBuf>,
    /// Watch set entries that are directories.
    pub dirs: Vec<PathBuf>,
    /// Watch set entries that are not.
    pub files: Vec<PathBuf>,
}

/// Choose the subscriptions that cover every watch set entry.
///
/// Directory subscriptions report changes to their direct children, so
/// every directory is subscribed and each file is covered by its parent.
/// Excluded entries are skipped.
pub fn plan_subscriptions(
    fs: &dyn FileSystem,
    watch_set: &[PathBuf],
    exclude: &ExcludeSet,
) -> SubscriptionPlan {
    let mut plan = SubscriptionPlan::default();
    let mut planned: HashSet<&Path> = HashSet::new();

    for path in watch_set.iter().filter(|p| !exclude.is_excluded(p)) {
        let target = if fs.is_dir(path) {
            plan.dirs.push(path.clone());
            path.as_path()
        } else {
            plan.files.push(path.clone());
            path.parent().unwrap_or(path.as_path())
        };
        if planned.insert(target) {
            plan.subscriptions.push(target.to_path_buf());
        }
    }
    plan
}

impl<S: ChangeSource> WatchRegistry<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Some(source),
            subscribed: HashSet::new(),
            dirs: HashSet::new(),
            files: HashSet::new(),
        }
    }

    /// Subscribe everything needed to cover `watch_set`.
    ///
    /// Any failure here is fatal to startup; returns the number of
    /// subscriptions made.
    pub fn register(
        &mut self,
        fs: &dyn FileSystem,
        watch_set: &[PathBuf],
        exclude: &ExcludeSet,
    ) -> Result<usize> {
        let plan = plan_subscriptions(fs, watch_set, exclude);
        let mut count = 0;
        for path in &plan.subscriptions {
            if self.subscribe(path)? {
                count += 1;
            }
        }
        self.dirs.extend(plan.dirs);
        self.files.extend(plan.files);

        info!(
            entries = watch_set.len(),
            subscriptions = count,
            "watching files and directories"
        );
        Ok(count)
    }

    /// Start watching a directory that appeared after startup. Returns
    /// `false` if it was already watched.
    pub fn watch_dir(&mut self, dir: &Path) -> Result<bool> {
        let added = self.subscribe(dir)?;
        self.dirs.insert(dir.to_path_buf());
        Ok(added)
    }

    fn subscribe(&mut self, path: &Path) -> Result<bool> {
        if self.subscribed.contains(path) {
            return Ok(false);
        }
        let Some(source) = self.source.as_mut() else {
            return Ok(false);
        };
        source.subscribe(path)?;
        debug!(?path, "subscribed");
        self.subscribed.insert(path.to_path_buf());
        Ok(true)
    }

    /// True if a change at `path` concerns the watch set: the path is a
    /// watched entry or a direct child of a watched directory.
    pub fn covers(&self, path: &Path) -> bool {
        self.files.contains(path)
            || self.dirs.contains(path)
            || path.parent().is_some_and(|parent| self.dirs.contains(parent))
    }

    pub fn is_subscribed(&self, path: &Path) -> bool {
        self.subscribed.contains(path)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscribed.len()
    }

    /// Next raw event from the source; `None` once closed.
    pub async fn next_event(&mut self) -> Option<RawEvent> {
        match self.source.as_mut() {
            Some(source) => source.next_event().await,
            None => None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    /// Release the change source.
    pub fn close(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.close();
            info!(subscriptions = self.subscribed.len(), "watch handle released");
            self.subscribed.clear();
        }
    }
}

impl<S: ChangeSource> Drop for WatchRegistry<S> {
    fn drop(&mut self) {
        self.close();
    }
}
