// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::fs::FileSystem;
use crate::watch::event_handler::{process_batch, BatchContext};
use crate::watch::patterns::{watch_roots, WatchBinding};

/// Watcher settings, from `[watch]`.
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    pub debounce: Duration,
    pub use_hash: bool,
}

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping the handle
/// stops watching and ends the batching task.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish_non_exhaustive()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn a filesystem watcher over the directories the bindings care about
/// and send `RuntimeEvent::BindingTriggered` for every binding matched by a
/// change batch.
///
/// Raw events are collected for `options.debounce` after the first one;
/// the whole batch is then processed at once.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    fs: Arc<dyn FileSystem>,
    bindings: Vec<WatchBinding>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    options: WatchOptions,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    warn!("failed to forward notify event: {err}");
                }
            }
            Err(err) => warn!("file watch error: {err}"),
        },
        Config::default(),
    )?;

    for dir in watch_roots(&root, &bindings) {
        if dir.is_dir() {
            watcher
                .watch(&dir, RecursiveMode::Recursive)
                .with_context(|| format!("watching {dir:?}"))?;
            info!("file watcher started on {:?}", dir);
        } else {
            debug!("watch root {:?} does not exist; skipping", dir);
        }
    }

    let ctx = BatchContext::new(root, fs, bindings, options.use_hash, runtime_tx);
    let debounce = options.debounce;

    let task = tokio::spawn(async move {
        {
            let ctx = ctx.clone();
            if let Err(err) = tokio::task::spawn_blocking(move || ctx.prime_hashes()).await {
                warn!("failed to prime watch hashes: {err}");
            }
        }

        while let Some(first) = event_rx.recv().await {
            let mut paths = Vec::new();
            collect_paths(first, &mut paths);

            let deadline = Instant::now() + debounce;
            loop {
                match tokio::time::timeout_at(deadline, event_rx.recv()).await {
                    Ok(Some(event)) => collect_paths(event, &mut paths),
                    Ok(None) | Err(_) => break,
                }
            }

            if paths.is_empty() {
                continue;
            }
            if !process_batch(&ctx, paths).await {
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        task,
    })
}

fn collect_paths(event: Event, paths: &mut Vec<PathBuf>) {
    debug!(?event, "received notify event");
    if matches!(event.kind, EventKind::Access(_)) {
        return;
    }
    for path in event.paths {
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
}
