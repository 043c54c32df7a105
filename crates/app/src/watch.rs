//! Intake folder. Statement files dropped into the watched directory
//! are stored and ingested as they appear.

use anyhow::{Context, Result};
use mutasi_core::AccountId;
use mutasi_import::StatementSource;
use mutasi_storage::{FsObjectStore, IngestOptions};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::AppContext;

/// Start a filesystem watcher on `watch_dir` that forwards newly
/// created paths into `tx`. The returned watcher must be kept alive
/// for events to keep flowing.
pub fn spawn_intake_watcher(
    watch_dir: &Path,
    tx: mpsc::Sender<PathBuf>,
) -> notify::Result<impl notify::Watcher> {
    use notify::{EventKind, RecursiveMode, Watcher};

    let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
        if let Ok(ev) = event {
            if matches!(ev.kind, EventKind::Create(_)) {
                for path in ev.paths {
                    let _ = tx.try_send(path);
                }
            }
        }
    })?;

    watcher.watch(watch_dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

pub async fn run(ctx: &AppContext, account: i64, dir: &Path, year: Option<i32>) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    // The channel bridges the notify watcher thread and the async loop.
    let (tx, mut rx) = mpsc::channel::<PathBuf>(64);
    let _watcher = spawn_intake_watcher(dir, tx).context("start the intake folder watcher")?;

    tracing::info!("watching {} for account {}", dir.display(), account);
    println!("watching {} (ctrl-c to stop)", dir.display());

    let store = FsObjectStore::new(&ctx.statements_dir);
    while let Some(path) = rx.recv().await {
        let ext = path.extension().and_then(|x| x.to_str()).unwrap_or("");
        if !matches!(ext, "csv" | "txt") {
            tracing::debug!("ignoring {}", path.display());
            continue;
        }
        match ingest_one(ctx, &store, account, &path, year).await {
            Ok(()) => {}
            Err(err) => tracing::warn!("intake failed for {}: {err:#}", path.display()),
        }
    }
    Ok(())
}

async fn ingest_one(
    ctx: &AppContext,
    store: &FsObjectStore,
    account: i64,
    path: &Path,
    year: Option<i32>,
) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let ext = path.extension().and_then(|x| x.to_str()).unwrap_or("csv");
    let stored = store.store(&bytes, ext)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("statement");

    let report = mutasi_storage::ingest_statement(
        &ctx.db,
        AccountId(account),
        StatementSource::Delimited(bytes),
        name,
        Some(&stored),
        IngestOptions {
            statement_year: year,
            ..IngestOptions::default()
        },
    )
    .await?;

    tracing::info!(
        "ingested {}: {} lines, {} duplicates (upload #{})",
        name,
        report.inserted,
        report.duplicates,
        report.upload_id
    );
    println!(
        "{name}: {} lines stored, {} duplicates",
        report.inserted, report.duplicates
    );
    Ok(())
}
