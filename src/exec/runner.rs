// src/exec/runner.rs

//! Lifecycle of a single command process.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::errors::{ReliveError, Result};
use crate::exec::signal;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Exited with status 0.
    Success,
    /// Exited with a non-zero status.
    Failed(i32),
    /// Killed by a signal nobody here sent.
    Killed(i32),
    /// Stopped because a newer change (or shutdown) replaced it.
    Superseded,
    /// Waiting on the process itself failed.
    Lost(String),
}

/// Build the platform shell invocation for `command`.
///
/// Output is inherited so the user sees it directly. On Unix the child
/// becomes the leader of a new process group.
pub fn shell_command(shell: &str, command: &str) -> Command {
    let mut cmd = Command::new(shell);
    if cfg!(windows) {
        cmd.arg("/C").arg(command);
    } else {
        cmd.arg("-c").arg(command);
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    cmd
}

/// The shell used when none is configured.
pub fn default_shell() -> &'static str {
    if cfg!(windows) { "cmd" } else { "sh" }
}

/// Spawn `command` through `shell`, mapping failures to `CommandStart`.
pub fn spawn_shell(shell: &str, command: &str) -> Result<Child> {
    shell_command(shell, command)
        .spawn()
        .map_err(|source| ReliveError::CommandStart {
            command: command.to_string(),
            source,
        })
}

/// Wait for `child` to exit, or stop it when `cancel_rx` fires.
///
/// A dropped cancel sender counts as a stop request too: the supervisor
/// only lets it go when it is shutting down.
pub async fn supervise_child(
    mut child: Child,
    run_id: u64,
    mut cancel_rx: oneshot::Receiver<()>,
    grace: Duration,
) -> RunOutcome {
    tokio::select! {
        status = child.wait() => match status {
            Ok(status) => outcome_from_status(status),
            Err(err) => RunOutcome::Lost(err.to_string()),
        },

        cancel = &mut cancel_rx => {
            if cancel.is_err() {
                debug!(run_id, "cancel channel closed; stopping command");
            }
            terminate_child(&mut child, run_id, grace).await;
            RunOutcome::Superseded
        }
    }
}

/// Ask the child to exit, wait up to `grace`, then kill it.
pub async fn terminate_child(child: &mut Child, run_id: u64, grace: Duration) {
    let Some(pid) = child.id() else {
        debug!(run_id, "command already exited");
        return;
    };

    info!(run_id, pid, "stopping previous command");
    if let Err(err) = signal::interrupt(pid) {
        debug!(run_id, pid, error = %err, "graceful stop unavailable; killing");
        if let Err(err) = child.start_kill() {
            warn!(run_id, pid, error = %err, "failed to kill command");
        }
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => debug!(run_id, pid, %status, "command stopped"),
        Ok(Err(err)) => warn!(run_id, pid, error = %err, "failed waiting for command to stop"),
        Err(_) => {
            let err = ReliveError::ProcessTerminationTimeout { pid, waited: grace };
            warn!(run_id, error = %err, "escalating to forceful kill");
            if let Err(err) = signal::kill(pid) {
                debug!(run_id, pid, error = %err, "group kill failed");
            }
            if let Err(err) = child.kill().await {
                warn!(run_id, pid, error = %err, "failed to kill command");
            }
        }
    }
}

fn outcome_from_status(status: ExitStatus) -> RunOutcome {
    if status.success() {
        return RunOutcome::Success;
    }
    if let Some(code) = status.code() {
        return RunOutcome::Failed(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return RunOutcome::Killed(sig);
        }
    }
    RunOutcome::Failed(-1)
}
