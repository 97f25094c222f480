#![cfg(unix)]

use std::error::Error;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;

use relive::engine::{ChangeKind, LogicalChange, RawEvent, TriggerReason};
use relive::errors::ReliveError;
use relive::exec::{spawn_supervisor, CommandBackend, RunOutcome, RunRequest, ShellBackend};
use relive::types::BusyPolicy;
use relive_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn request(run_id: u64) -> RunRequest {
    RunRequest {
        run_id,
        reason: TriggerReason::FileWatch,
        paths: Vec::new(),
    }
}

fn change(path: &str) -> LogicalChange {
    LogicalChange {
        reason: TriggerReason::FileWatch,
        changes: vec![RawEvent::new(path, ChangeKind::Modified)],
        event_count: 1,
    }
}

fn lines(path: &PathBuf) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn exit_status_is_reported() -> TestResult {
    init_tracing();
    let mut backend = ShellBackend::new("exit 3", Duration::from_secs(1));
    let (_cancel_tx, cancel_rx) = oneshot::channel();

    let run = backend.start(request(1), cancel_rx)?;
    assert_eq!(with_timeout(run).await, RunOutcome::Failed(3));

    let mut backend = ShellBackend::new("true", Duration::from_secs(1));
    let (_cancel_tx, cancel_rx) = oneshot::channel();
    let run = backend.start(request(2), cancel_rx)?;
    assert_eq!(with_timeout(run).await, RunOutcome::Success);
    Ok(())
}

#[tokio::test]
async fn missing_shell_is_a_start_error() {
    init_tracing();
    let mut backend =
        ShellBackend::new("true", Duration::from_secs(1)).with_shell("/definitely/not/a/shell");
    let (_cancel_tx, cancel_rx) = oneshot::channel();

    match backend.start(request(1), cancel_rx) {
        Err(err @ ReliveError::CommandStart { .. }) => assert!(!err.is_fatal()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("start should have failed"),
    }
}

#[tokio::test]
async fn superseded_command_never_finishes_its_work() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("out.log");
    let cmd = format!("sleep 0.4; echo done >> '{}'", out.display());

    let backend = ShellBackend::new(cmd, Duration::from_secs(1));
    let (tx, rx) = mpsc::channel(4);
    let supervisor = spawn_supervisor(backend, BusyPolicy::Restart, rx);

    tx.send(change("a.go")).await?;
    sleep(Duration::from_millis(100)).await;
    tx.send(change("b.go")).await?;

    // Only the second run may complete.
    sleep(Duration::from_millis(900)).await;
    assert_eq!(lines(&out), vec!["done".to_string()]);

    drop(tx);
    with_timeout(supervisor).await?;
    Ok(())
}

#[tokio::test]
async fn command_ignoring_sigterm_is_killed_after_grace() -> TestResult {
    init_tracing();
    let backend = ShellBackend::new("trap '' TERM; sleep 30", Duration::from_millis(200));
    let (tx, rx) = mpsc::channel(4);
    let supervisor = spawn_supervisor(backend, BusyPolicy::Restart, rx);

    tx.send(change("a.go")).await?;
    sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    drop(tx);
    with_timeout(supervisor).await?;
    assert!(started.elapsed() < Duration::from_secs(5));
    Ok(())
}

#[tokio::test]
async fn shutdown_stops_the_whole_process_group() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("child.log");
    // The background grandchild must die with its shell.
    let cmd = format!("(sleep 0.4; echo leaked >> '{}') & wait", out.display());

    let backend = ShellBackend::new(cmd, Duration::from_secs(1));
    let (tx, rx) = mpsc::channel(4);
    let supervisor = spawn_supervisor(backend, BusyPolicy::Restart, rx);

    tx.send(change("a.go")).await?;
    sleep(Duration::from_millis(100)).await;
    drop(tx);
    with_timeout(supervisor).await?;

    sleep(Duration::from_millis(600)).await;
    assert!(lines(&out).is_empty());
    Ok(())
}
