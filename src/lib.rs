// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::WatchConfig;
use crate::engine::{spawn_debouncer, LogicalChange, RawEvent};
use crate::errors::{ReliveError, Result};
use crate::exec::{spawn_supervisor, CommandBackend, ShellBackend};
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::{
    expand_patterns, filter, ChangeSource, EventLoop, ExcludeSet, ExpandOptions, LoopExit,
    LoopStats, NotifySource, WatchRegistry,
};

/// Capacity of the channel between the debouncer and the supervisor.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// The expanded watch set together with the exclusions that shaped it.
#[derive(Debug, Clone)]
pub struct WatchPlan {
    pub watch_set: Vec<PathBuf>,
    pub exclude: ExcludeSet,
}

/// Expand the configured patterns and drop everything excluded.
///
/// Walks the filesystem synchronously.
pub fn plan_watch(fs: &dyn FileSystem, cfg: &WatchConfig) -> Result<WatchPlan> {
    let options = ExpandOptions {
        watch_cwd: cfg.watch_cwd,
        recursive: cfg.recursive,
    };
    let expanded = expand_patterns(fs, &cfg.root, &cfg.patterns, options)?;
    let exclude = ExcludeSet::build(fs, &cfg.root, &cfg.exclude, cfg.default_excludes)?;
    let watch_set = filter(&expanded, &exclude);

    debug!(
        expanded = expanded.len(),
        kept = watch_set.len(),
        "watch set computed"
    );
    Ok(WatchPlan { watch_set, exclude })
}

/// What the pipeline did before it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineReport {
    pub exit: LoopExit,
    pub stats: LoopStats,
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - pattern expansion and exclusions (on a blocking thread)
/// - the `notify` watch registry
/// - event loop / debouncer / supervisor
/// - Ctrl-C and SIGTERM handling
pub async fn run(config: WatchConfig) -> Result<()> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let plan = {
        let fs = Arc::clone(&fs);
        let cfg = config.clone();
        tokio::task::spawn_blocking(move || plan_watch(fs.as_ref(), &cfg))
            .await
            .map_err(|e| ReliveError::Other(e.into()))??
    };

    if config.verbose {
        info!(pid = std::process::id(), root = ?config.root, "relive started");
        info!(patterns = ?config.patterns, "watch patterns");
        info!(exclude = ?plan.exclude.entries(), "exclusions");
        info!(watching = ?plan.watch_set, "expanded watch list");
    }

    if plan.watch_set.is_empty() {
        warn!("nothing to watch after expansion and exclusions");
    }

    let mut registry = WatchRegistry::new(NotifySource::open()?);
    registry.register(fs.as_ref(), &plan.watch_set, &plan.exclude)?;

    let backend = ShellBackend::from_config(&config);
    let report = run_pipeline(
        &config,
        &mut registry,
        Arc::new(plan.exclude),
        fs,
        backend,
        shutdown_signal(),
    )
    .await?;

    info!(exit = ?report.exit, forwarded = report.stats.forwarded, "relive stopped");
    Ok(())
}

/// Run event loop, debouncer and supervisor until `shutdown` resolves or
/// the source closes.
///
/// Teardown runs front to back: the event loop stops accepting events, the
/// debouncer drops any unfired change, the supervisor stops the running
/// command and waits for it, and only then is the watch handle released.
pub async fn run_pipeline<S, B, F>(
    cfg: &WatchConfig,
    registry: &mut WatchRegistry<S>,
    exclude: Arc<ExcludeSet>,
    fs: Arc<dyn FileSystem>,
    backend: B,
    shutdown: F,
) -> Result<PipelineReport>
where
    S: ChangeSource,
    B: CommandBackend,
    F: Future<Output = ()>,
{
    let (raw_tx, raw_rx) = mpsc::unbounded_channel::<RawEvent>();
    let (change_tx, change_rx) = mpsc::channel::<LogicalChange>(CHANGE_CHANNEL_CAPACITY);

    let supervisor = spawn_supervisor(backend, cfg.on_busy, change_rx);

    if cfg.initial_run {
        debug!("queueing initial run");
        if change_tx.send(LogicalChange::startup()).await.is_err() {
            warn!("supervisor exited before the initial run");
        }
    }

    let debouncer = spawn_debouncer(cfg.debounce_mode, cfg.debounce, raw_rx, change_tx);

    let event_loop = EventLoop::new(exclude, fs, cfg.recursive, raw_tx);
    let (exit, stats) = event_loop.run(registry, shutdown).await;

    debouncer.await.map_err(|e| ReliveError::Other(e.into()))?;
    supervisor.await.map_err(|e| ReliveError::Other(e.into()))?;
    registry.close();

    Ok(PipelineReport { exit, stats })
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Print the resolved configuration and the expanded lists without
/// watching anything.
pub fn print_dry_run(cfg: &WatchConfig) -> Result<()> {
    let plan = plan_watch(&RealFileSystem, cfg)?;

    println!("relive dry-run");
    println!("  root = {}", cfg.root.display());
    println!("  command = {}", cfg.command);
    println!("  recursive = {}", cfg.recursive);
    println!("  debounce = {:?} ({:?})", cfg.debounce, cfg.debounce_mode);
    println!("  on_busy = {:?}", cfg.on_busy);
    println!("  kill_timeout = {:?}", cfg.kill_timeout);
    println!("  initial_run = {}", cfg.initial_run);
    println!();

    println!("patterns ({}):", cfg.patterns.len());
    for p in &cfg.patterns {
        println!("  - {p}");
    }

    let entries = plan.exclude.entries();
    println!("exclude ({}):", entries.len());
    for e in entries {
        println!("  - {}", e.display());
    }

    println!("watching ({}):", plan.watch_set.len());
    for path in &plan.watch_set {
        println!("  - {}", path.display());
    }

    debug!("dry-run complete (nothing watched)");
    Ok(())
}
