use std::sync::{Arc, Mutex};

use relive::errors::{ReliveError, Result};
use relive::exec::{CommandBackend, RunFuture, RunOutcome, RunRequest};
use tokio::sync::{oneshot, watch};

/// A fake command backend that:
/// - records every run request it receives
/// - tracks how many runs are alive at once
/// - keeps each run going until the test releases it or it is cancelled.
#[derive(Clone)]
pub struct RecordingBackend {
    state: Arc<Mutex<State>>,
    /// Runs with an id at or below this value may finish.
    released: Arc<watch::Sender<u64>>,
    instant: bool,
}

#[derive(Default)]
struct State {
    started: Vec<RunRequest>,
    finished: Vec<(u64, RunOutcome)>,
    live: usize,
    max_live: usize,
    fail_next: usize,
}

impl RecordingBackend {
    /// Runs stay alive until [`release`](Self::release)d or cancelled.
    pub fn new() -> Self {
        let (released, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(State::default())),
            released: Arc::new(released),
            instant: false,
        }
    }

    /// Runs finish successfully as soon as they start.
    pub fn instant() -> Self {
        Self {
            instant: true,
            ..Self::new()
        }
    }

    /// Let every run with an id up to `run_id` exit successfully.
    pub fn release(&self, run_id: u64) {
        self.released.send_modify(|v| *v = (*v).max(run_id));
    }

    /// Make the next `n` starts fail with `CommandStart`.
    pub fn fail_next(&self, n: usize) {
        self.state.lock().unwrap().fail_next = n;
    }

    pub fn started(&self) -> Vec<RunRequest> {
        self.state.lock().unwrap().started.clone()
    }

    pub fn started_count(&self) -> usize {
        self.state.lock().unwrap().started.len()
    }

    pub fn finished(&self) -> Vec<(u64, RunOutcome)> {
        self.state.lock().unwrap().finished.clone()
    }

    pub fn live(&self) -> usize {
        self.state.lock().unwrap().live
    }

    pub fn max_live(&self) -> usize {
        self.state.lock().unwrap().max_live
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBackend for RecordingBackend {
    fn start(&mut self, run: RunRequest, mut cancel: oneshot::Receiver<()>) -> Result<RunFuture> {
        let run_id = run.run_id;
        {
            let mut state = self.state.lock().unwrap();
            if state.fail_next > 0 {
                state.fail_next -= 1;
                return Err(ReliveError::CommandStart {
                    command: "recording-backend".to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            state.started.push(run);
            state.live += 1;
            state.max_live = state.max_live.max(state.live);
        }

        let state = Arc::clone(&self.state);
        let mut released = self.released.subscribe();
        let instant = self.instant;

        Ok(Box::pin(async move {
            let outcome = if instant {
                RunOutcome::Success
            } else {
                tokio::select! {
                    _ = &mut cancel => RunOutcome::Superseded,
                    res = async { released.wait_for(|v| *v >= run_id).await.map(|_| ()) } => {
                        match res {
                            Ok(()) => RunOutcome::Success,
                            Err(_) => RunOutcome::Lost("release channel closed".to_string()),
                        }
                    }
                }
            };

            let mut state = state.lock().unwrap();
            state.live -= 1;
            state.finished.push((run_id, outcome.clone()));
            outcome
        }))
    }
}
