#![cfg(target_os = "linux")]

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::time::sleep;

use relive::config::WatchConfig;
use relive::fs::{FileSystem, RealFileSystem};
use relive::watch::{NotifySource, WatchRegistry};
use relive::{plan_watch, run_pipeline, PipelineReport};
use relive_test_utils::builders::{write_tree, WatchConfigBuilder};
use relive_test_utils::recording_backend::RecordingBackend;
use relive_test_utils::{init_tracing, wait_until, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

/// Long enough for inotify delivery plus a 50ms debounce.
const QUIET: Duration = Duration::from_millis(300);

fn project(entries: &[&str]) -> Result<(TempDir, PathBuf), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    write_tree(&root, entries);
    Ok((dir, root))
}

fn touch(path: &Path, contents: &str) {
    fs::write(path, contents).expect("write file");
}

/// Run the pipeline over real inotify watches while `script` edits files.
async fn run_on_disk<F, Fut>(cfg: &WatchConfig, script: F) -> Result<PipelineReport, Box<dyn Error>>
where
    F: FnOnce(RecordingBackend, oneshot::Sender<()>) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let plan = plan_watch(&RealFileSystem, cfg)?;
    let mut registry = WatchRegistry::new(NotifySource::open()?);
    registry.register(&RealFileSystem, &plan.watch_set, &plan.exclude)?;

    let backend = RecordingBackend::instant();
    let runs = backend.clone();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let shutdown = async {
        let _ = stop_rx.await;
    };
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let (report, ()) = with_timeout(async {
        tokio::join!(
            run_pipeline(cfg, &mut registry, Arc::new(plan.exclude), fs, backend, shutdown),
            script(runs, stop_tx),
        )
    })
    .await;
    assert!(!registry.is_open());
    Ok(report?)
}

#[tokio::test]
async fn writes_and_rename_over_saves_each_run_once() -> TestResult {
    init_tracing();
    let (_dir, root) = project(&["src/a.go", "src/vendor/c.go", "vendor/d.go"])?;
    let cfg = WatchConfigBuilder::new(&root)
        .pattern("src/**/*.go")
        .exclude("vendor")
        .debounce_ms(50)
        .build();
    let src = root.join("src");

    let report = run_on_disk(&cfg, |runs, stop| async move {
        sleep(QUIET).await;

        touch(&src.join("a.go"), "package a // 1\n");
        wait_until(|| runs.started_count() == 1).await;
        sleep(QUIET).await;
        assert_eq!(runs.started_count(), 1);

        // Editor-style save: write a sibling, then rename it over the file.
        let staged = src.join(".a.go.swp");
        touch(&staged, "package a // 2\n");
        fs::rename(&staged, src.join("a.go")).expect("rename over a.go");
        wait_until(|| runs.started_count() == 2).await;
        sleep(QUIET).await;
        assert_eq!(runs.started_count(), 2);

        // The replaced inode must not take the watch with it.
        touch(&src.join("a.go"), "package a // 3\n");
        wait_until(|| runs.started_count() == 3).await;

        touch(&src.join("vendor/c.go"), "package c // edited\n");
        touch(&root.join("vendor/d.go"), "package d // edited\n");
        sleep(QUIET).await;
        assert_eq!(runs.started_count(), 3);
        let _ = stop.send(());
    })
    .await?;

    assert!(report.stats.forwarded >= 3);
    Ok(())
}

#[tokio::test]
async fn directories_created_at_runtime_are_followed() -> TestResult {
    init_tracing();
    let (_dir, root) = project(&["pkg/main.go", "vendor/lib.go"])?;
    let cfg = WatchConfigBuilder::new(&root)
        .pattern(".")
        .exclude("vendor")
        .debounce_ms(50)
        .build();
    let pkg = root.join("pkg");

    let report = run_on_disk(&cfg, |runs, stop| async move {
        sleep(QUIET).await;

        fs::create_dir_all(pkg.join("new/inner")).expect("create nested dirs");
        wait_until(|| runs.started_count() == 1).await;
        sleep(QUIET).await;

        touch(&pkg.join("new/inner/x.go"), "package inner\n");
        wait_until(|| runs.started_count() == 2).await;

        fs::create_dir_all(pkg.join("vendor")).expect("create vendor dir");
        sleep(QUIET).await;
        touch(&pkg.join("vendor/y.go"), "package y\n");
        touch(&root.join("vendor/lib.go"), "package lib // edited\n");
        sleep(QUIET).await;
        assert_eq!(runs.started_count(), 2);
        let _ = stop.send(());
    })
    .await?;

    assert!(report.stats.subscribed_later >= 2);
    assert!(report.stats.excluded >= 1);
    Ok(())
}
