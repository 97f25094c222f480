use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use relive::engine::{ChangeKind, RawEvent};
use relive::errors::{ReliveError, Result};
use relive::watch::ChangeSource;
use tokio::sync::mpsc;

/// A change source driven by the test instead of the OS.
///
/// Events are injected through the paired [`FakeSourceHandle`]; dropping
/// the handle ends the stream like a source that went away.
pub struct FakeSource {
    events: mpsc::UnboundedReceiver<RawEvent>,
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    subscribed: Mutex<Vec<PathBuf>>,
    refused: Mutex<Vec<PathBuf>>,
    closed: AtomicBool,
}

/// Test-side controls for a [`FakeSource`].
#[derive(Clone)]
pub struct FakeSourceHandle {
    tx: mpsc::UnboundedSender<RawEvent>,
    shared: Arc<Shared>,
}

impl FakeSource {
    pub fn new() -> (Self, FakeSourceHandle) {
        let (tx, events) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());
        let source = Self {
            events,
            shared: Arc::clone(&shared),
        };
        (source, FakeSourceHandle { tx, shared })
    }
}

impl ChangeSource for FakeSource {
    fn subscribe(&mut self, path: &Path) -> Result<()> {
        if self.shared.refused.lock().unwrap().iter().any(|p| p == path) {
            return Err(ReliveError::WatchInit(format!(
                "refusing to watch {}",
                path.display()
            )));
        }
        self.shared
            .subscribed
            .lock()
            .unwrap()
            .push(path.to_path_buf());
        Ok(())
    }

    fn next_event(&mut self) -> Pin<Box<dyn Future<Output = Option<RawEvent>> + Send + '_>> {
        Box::pin(async move {
            if self.shared.closed.load(Ordering::SeqCst) {
                return None;
            }
            self.events.recv().await
        })
    }

    fn close(&mut self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.events.close();
    }
}

impl FakeSourceHandle {
    pub fn emit(&self, path: impl Into<PathBuf>, kind: ChangeKind) {
        // The receiver may already be gone when a test emits after shutdown.
        let _ = self.tx.send(RawEvent::new(path, kind));
    }

    pub fn modify(&self, path: impl Into<PathBuf>) {
        self.emit(path, ChangeKind::Modified);
    }

    /// Make future `subscribe` calls for `path` fail.
    pub fn refuse(&self, path: impl Into<PathBuf>) {
        self.shared.refused.lock().unwrap().push(path.into());
    }

    pub fn subscribed(&self) -> Vec<PathBuf> {
        self.shared.subscribed.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}
