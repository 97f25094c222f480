// src/engine/debouncer.rs

use std::future::pending;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::core::DebounceCore;
use super::{LogicalChange, RawEvent};
use crate::types::DebounceMode;

/// Spawn the debouncer task.
///
/// Accepted raw events arrive on `events`; one [`LogicalChange`] per burst
/// is sent on `changes`. The input is an unbounded channel so the event
/// loop never waits on this stage; state is owned by this single task, so
/// event arrival and timer expiry never race.
///
/// The task ends when `events` is closed (a pending, unfired change is
/// dropped) or when the receiver of `changes` goes away.
pub fn spawn_debouncer(
    mode: DebounceMode,
    quiet: Duration,
    mut events: mpsc::UnboundedReceiver<RawEvent>,
    changes: mpsc::Sender<LogicalChange>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(?mode, ?quiet, "debouncer started");
        let mut core = DebounceCore::new(mode, quiet);

        loop {
            let deadline = core.deadline();

            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        debug!(path = ?event.path, kind = ?event.kind, "debouncer accepted event");
                        core.push(event, Instant::now());
                    }
                    None => {
                        if core.is_pending() {
                            debug!("event channel closed; dropping pending change");
                        }
                        break;
                    }
                },

                _ = sleep_until(deadline) => {
                    let Some(change) = core.poll_fire(Instant::now()) else {
                        continue;
                    };
                    info!(
                        events = change.event_count,
                        paths = change.paths().len(),
                        first = ?change.paths().first(),
                        "change detected"
                    );
                    if changes.send(change).await.is_err() {
                        debug!("change receiver dropped; stopping debouncer");
                        break;
                    }
                }
            }
        }

        debug!("debouncer finished");
    })
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ChangeKind;
    use tokio::time::timeout;

    #[tokio::test]
    async fn burst_produces_single_change() {
        let (ev_tx, ev_rx) = mpsc::unbounded_channel();
        let (ch_tx, mut ch_rx) = mpsc::channel(8);
        let handle = spawn_debouncer(DebounceMode::Trailing, Duration::from_millis(50), ev_rx, ch_tx);

        for _ in 0..10 {
            ev_tx.send(RawEvent::new("/p/a.go", ChangeKind::Modified)).unwrap();
        }

        let change = timeout(Duration::from_secs(2), ch_rx.recv())
            .await
            .expect("change should fire")
            .expect("channel open");
        assert_eq!(change.event_count, 10);

        // Nothing else follows the burst.
        assert!(timeout(Duration::from_millis(200), ch_rx.recv()).await.is_err());

        drop(ev_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn closing_input_drops_pending_change() {
        let (ev_tx, ev_rx) = mpsc::unbounded_channel();
        let (ch_tx, mut ch_rx) = mpsc::channel(8);
        let handle = spawn_debouncer(DebounceMode::Fixed, Duration::from_secs(10), ev_rx, ch_tx);

        ev_tx.send(RawEvent::new("/p/a.go", ChangeKind::Modified)).unwrap();
        drop(ev_tx);

        handle.await.unwrap();
        assert!(ch_rx.recv().await.is_none());
    }
}
