// src/exec/supervisor.rs

//! The process supervisor loop.
//!
//! One task owns the single running-process slot and handles changes one
//! at a time, so the check-then-act of "stop the old run, start the new
//! one" never interleaves. A new run is only started after the previous
//! run's future has resolved, so two children are never alive at once.

use std::future::pending;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::LogicalChange;
use crate::exec::backend::{CommandBackend, RunRequest};
use crate::exec::runner::RunOutcome;
use crate::types::BusyPolicy;

/// Handle for the currently running command.
///
/// - `cancel` asks the run to stop (restart policy or shutdown).
/// - `handle` is the Tokio task driving the run to completion.
struct ActiveRun {
    run_id: u64,
    started: Instant,
    cancel: Option<oneshot::Sender<()>>,
    handle: JoinHandle<RunOutcome>,
}

/// Spawn the supervisor loop.
///
/// It consumes changes from `changes` until the channel closes, then stops
/// whatever is still running and returns.
pub fn spawn_supervisor<B: CommandBackend>(
    backend: B,
    policy: BusyPolicy,
    changes: mpsc::Receiver<LogicalChange>,
) -> JoinHandle<()> {
    tokio::spawn(Supervisor::new(backend, policy).run(changes))
}

pub struct Supervisor<B: CommandBackend> {
    backend: B,
    policy: BusyPolicy,
    active: Option<ActiveRun>,
    pending: Option<LogicalChange>,
    next_run_id: u64,
}

impl<B: CommandBackend> std::fmt::Debug for Supervisor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("policy", &self.policy)
            .field("active", &self.active.as_ref().map(|a| a.run_id))
            .field("pending", &self.pending.is_some())
            .finish_non_exhaustive()
    }
}

impl<B: CommandBackend> Supervisor<B> {
    pub fn new(backend: B, policy: BusyPolicy) -> Self {
        Self {
            backend,
            policy,
            active: None,
            pending: None,
            next_run_id: 1,
        }
    }

    /// Main loop: react to new changes and to the running command exiting.
    pub async fn run(mut self, mut changes: mpsc::Receiver<LogicalChange>) {
        info!(policy = ?self.policy, "supervisor started");

        loop {
            tokio::select! {
                change = changes.recv() => match change {
                    Some(change) => self.on_change(change).await,
                    None => break,
                },

                outcome = wait_for(&mut self.active) => {
                    if let Some(run) = self.active.take() {
                        report(run.run_id, run.started, &outcome);
                    }
                    if let Some(next) = self.pending.take() {
                        debug!("starting queued run");
                        self.start(next);
                    }
                }
            }
        }

        info!("change channel closed; stopping supervisor");
        self.pending = None;
        self.stop_active().await;
        info!("supervisor finished");
    }

    /// Handle one logical change according to the busy policy.
    async fn on_change(&mut self, change: LogicalChange) {
        self.reap_finished().await;

        if self.active.is_none() {
            self.start(change);
            return;
        }

        match self.policy {
            BusyPolicy::Restart => {
                self.stop_active().await;
                self.start(change);
            }
            BusyPolicy::Queue => {
                if self.pending.replace(change).is_some() {
                    debug!("merged change into the already queued run");
                } else {
                    info!("command still running; queued one more run");
                }
            }
        }
    }

    /// Clear the slot if the run already ended but its exit was not
    /// observed yet.
    async fn reap_finished(&mut self) {
        let finished = self.active.as_ref().is_some_and(|run| run.handle.is_finished());
        if !finished {
            return;
        }
        if let Some(run) = self.active.take() {
            let outcome = join_outcome(run.handle).await;
            report(run.run_id, run.started, &outcome);
        }
    }

    fn start(&mut self, change: LogicalChange) {
        let run_id = self.next_run_id;
        self.next_run_id += 1;

        let request = RunRequest {
            run_id,
            reason: change.reason,
            paths: change.paths().into_iter().cloned().collect(),
        };
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        match self.backend.start(request, cancel_rx) {
            Ok(run) => {
                self.active = Some(ActiveRun {
                    run_id,
                    started: Instant::now(),
                    cancel: Some(cancel_tx),
                    handle: tokio::spawn(run),
                });
            }
            Err(err) => {
                // Not fatal: the next change retries.
                error!(run_id, error = %err, "could not start command");
            }
        }
    }

    /// Stop the running command (if any) and wait until it is gone.
    async fn stop_active(&mut self) {
        let Some(mut run) = self.active.take() else {
            return;
        };

        if let Some(cancel) = run.cancel.take() {
            if cancel.send(()).is_err() {
                debug!(run_id = run.run_id, "command already finished while cancelling");
            }
        }

        let outcome = join_outcome(run.handle).await;
        report(run.run_id, run.started, &outcome);
    }
}

async fn wait_for(active: &mut Option<ActiveRun>) -> RunOutcome {
    match active {
        Some(run) => match (&mut run.handle).await {
            Ok(outcome) => outcome,
            Err(err) => RunOutcome::Lost(err.to_string()),
        },
        None => pending().await,
    }
}

async fn join_outcome(handle: JoinHandle<RunOutcome>) -> RunOutcome {
    handle
        .await
        .unwrap_or_else(|err| RunOutcome::Lost(err.to_string()))
}

fn report(run_id: u64, started: Instant, outcome: &RunOutcome) {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match outcome {
        RunOutcome::Success => info!(run_id, elapsed_ms, "command finished"),
        RunOutcome::Failed(code) => {
            warn!(run_id, elapsed_ms, exit_code = code, "command exited with non-zero status")
        }
        RunOutcome::Killed(sig) => warn!(run_id, elapsed_ms, signal = sig, "command killed by signal"),
        RunOutcome::Superseded => debug!(run_id, elapsed_ms, "command stopped"),
        RunOutcome::Lost(err) => error!(run_id, elapsed_ms, error = %err, "lost track of command"),
    }
}
