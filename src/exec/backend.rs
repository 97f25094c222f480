// src/exec/backend.rs

//! Pluggable command backend.
//!
//! The supervisor talks to a `CommandBackend` instead of spawning processes
//! itself. Production uses [`ShellBackend`]; tests substitute a backend
//! that records runs and finishes them on demand.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::info;

use crate::config::WatchConfig;
use crate::engine::TriggerReason;
use crate::errors::Result;
use crate::exec::runner::{default_shell, spawn_shell, supervise_child, RunOutcome};

/// Future resolving once a started run has fully ended.
pub type RunFuture = Pin<Box<dyn Future<Output = RunOutcome> + Send + 'static>>;

/// One request to run the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub run_id: u64,
    pub reason: TriggerReason,
    /// Paths from the triggering change, for diagnostics.
    pub paths: Vec<PathBuf>,
}

/// Trait abstracting how the command is executed.
pub trait CommandBackend: Send + 'static {
    /// Start a run.
    ///
    /// Errors (typically `CommandStart`) mean nothing was started. On
    /// success the returned future must resolve only after the process is
    /// gone, stopping it early once `cancel` fires or is dropped.
    fn start(&mut self, run: RunRequest, cancel: oneshot::Receiver<()>) -> Result<RunFuture>;
}

/// Runs the configured command through the platform shell.
#[derive(Debug, Clone)]
pub struct ShellBackend {
    shell: String,
    command: String,
    grace: Duration,
}

impl ShellBackend {
    pub fn new(command: impl Into<String>, grace: Duration) -> Self {
        Self {
            shell: default_shell().to_string(),
            command: command.into(),
            grace,
        }
    }

    pub fn from_config(cfg: &WatchConfig) -> Self {
        Self::new(cfg.command.clone(), cfg.kill_timeout)
    }

    /// Use a different shell binary (still invoked with `-c` / `/C`).
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }
}

impl CommandBackend for ShellBackend {
    fn start(&mut self, run: RunRequest, cancel: oneshot::Receiver<()>) -> Result<RunFuture> {
        let child = spawn_shell(&self.shell, &self.command)?;
        info!(
            run_id = run.run_id,
            pid = ?child.id(),
            reason = ?run.reason,
            cmd = %self.command,
            "starting command"
        );
        Ok(Box::pin(supervise_child(child, run.run_id, cancel, self.grace)))
    }
}
