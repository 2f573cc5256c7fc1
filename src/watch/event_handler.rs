// src/watch/event_handler.rs

//! Turning one change batch into binding triggers.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::fs::FileSystem;
use crate::watch::cache::FileCache;
use crate::watch::hash::{compute_aggregate_hash, MemoryHashStore};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{bindings_for_paths, collect_matching_files, WatchBinding};

/// State shared by every batch of one watcher.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub bindings: Arc<Vec<WatchBinding>>,
    pub use_hash: bool,
    pub runtime_tx: mpsc::Sender<RuntimeEvent>,
    pub hashes: Arc<Mutex<MemoryHashStore>>,
    pub cache: Arc<Mutex<FileCache>>,
}

impl BatchContext {
    pub fn new(
        root: PathBuf,
        fs: Arc<dyn FileSystem>,
        bindings: Vec<WatchBinding>,
        use_hash: bool,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            root,
            fs,
            bindings: Arc::new(bindings),
            use_hash,
            runtime_tx,
            hashes: Arc::new(Mutex::new(MemoryHashStore::new())),
            cache: Arc::new(Mutex::new(FileCache::new())),
        }
    }

    /// Record the current content hash of every binding, so that the first
    /// touch-without-change after startup is already recognised.
    pub fn prime_hashes(&self) {
        if !self.use_hash {
            return;
        }
        for binding in self.bindings.iter() {
            if let Some(hash) = self.binding_hash(binding) {
                self.hashes.lock().update(binding.name(), &hash);
            }
        }
    }

    fn binding_hash(&self, binding: &WatchBinding) -> Option<String> {
        let files = match collect_matching_files(self.fs.as_ref(), &self.root, binding) {
            Ok(files) => files,
            Err(err) => {
                warn!(binding = %binding.name(), error = %err, "failed to collect watched files");
                return None;
            }
        };

        let mut cache = self.cache.lock();
        let mut entries = Vec::with_capacity(files.len());
        for path in files {
            match cache.get_or_compute(self.fs.as_ref(), &path) {
                Ok(hash) => entries.push((path.to_string_lossy().into_owned(), hash)),
                Err(err) => {
                    warn!(binding = %binding.name(), file = ?path, error = %err, "failed to hash file");
                    return None;
                }
            }
        }
        Some(compute_aggregate_hash(&entries))
    }
}

/// Process one debounced batch of changed paths.
///
/// Each binding matching at least one path is triggered once. Returns
/// `false` when the runtime channel is closed and the watcher should stop.
pub async fn process_batch(ctx: &BatchContext, paths: Vec<PathBuf>) -> bool {
    let mut rel_paths: Vec<String> = Vec::new();
    for path in &paths {
        match relative_str(&ctx.root, path) {
            Some(rel) if !rel_paths.contains(&rel) => rel_paths.push(rel),
            Some(_) => {}
            None => warn!("could not relativize path {:?} against root {:?}", path, ctx.root),
        }
    }
    if rel_paths.is_empty() {
        return true;
    }
    debug!(?rel_paths, "processing change batch");

    let selected: Vec<WatchBinding> = bindings_for_paths(&ctx.bindings, &rel_paths)
        .into_iter()
        .cloned()
        .collect();

    for binding in selected {
        if ctx.use_hash && !content_changed(ctx, &binding, &paths).await {
            info!(binding = %binding.name(), "watched content unchanged; skipping trigger");
            continue;
        }

        debug!(binding = %binding.name(), "watch match -> triggering binding");
        if let Err(err) = ctx
            .runtime_tx
            .send(RuntimeEvent::BindingTriggered {
                binding: binding.name().to_string(),
                reason: TriggerReason::FileWatch,
            })
            .await
        {
            warn!("failed to send RuntimeEvent::BindingTriggered: {err}");
            return false;
        }
    }
    true
}

async fn content_changed(ctx: &BatchContext, binding: &WatchBinding, paths: &[PathBuf]) -> bool {
    let ctx = ctx.clone();
    let binding = binding.clone();
    let paths = paths.to_vec();

    tokio::task::spawn_blocking(move || {
        {
            let mut cache = ctx.cache.lock();
            for path in &paths {
                cache.invalidate(path);
            }
        }
        match ctx.binding_hash(&binding) {
            Some(hash) => ctx.hashes.lock().update(binding.name(), &hash),
            // Could not hash: trigger anyway.
            None => true,
        }
    })
    .await
    .unwrap_or(true)
}
