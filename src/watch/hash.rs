// src/watch/hash.rs

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Result;
use blake3::Hasher;
use tracing::{debug, info};

use crate::engine::BindingName;
use crate::fs::FileSystem;

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let bytes = fs.read(path)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Aggregate `(path, file hash)` pairs into one hash.
///
/// Pairs are sorted by path first, so the result does not depend on
/// iteration order; paths take part so that a rename changes the hash.
pub fn compute_aggregate_hash(entries: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = entries.iter().collect();
    sorted.sort();

    let mut hasher = Hasher::new();
    for (path, hash) in sorted {
        hasher.update(path.as_bytes());
        hasher.update(b"\0");
        hasher.update(hash.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}

/// Hash of a whole directory tree: every file's relative path and contents.
///
/// A missing directory hashes like an empty one. Symlinked directories are
/// expanded once.
pub fn compute_tree_hash(fs: &dyn FileSystem, dir: &Path) -> Result<String> {
    let mut entries = Vec::new();
    if fs.is_dir(dir) {
        let mut visited = HashSet::new();
        let mut stack = vec![dir.to_path_buf()];
        while let Some(current) = stack.pop() {
            let canonical = fs.canonicalize(&current).unwrap_or_else(|_| current.clone());
            if !visited.insert(canonical) {
                continue;
            }
            for path in fs.read_dir(&current)? {
                if fs.is_dir(&path) {
                    stack.push(path);
                } else if fs.is_file(&path) {
                    let rel = path
                        .strip_prefix(dir)
                        .unwrap_or(&path)
                        .to_string_lossy()
                        .replace('\\', "/");
                    entries.push((rel, compute_file_hash(fs, &path)?));
                }
            }
        }
    }
    let hash = compute_aggregate_hash(&entries);
    debug!(dir = ?dir, files = entries.len(), hash = %hash, "computed tree hash");
    Ok(hash)
}

/// Last seen aggregate hash per binding, kept for the lifetime of the
/// watcher.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: HashMap<BindingName, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, binding: &str) -> Option<&str> {
        self.map.get(binding).map(String::as_str)
    }

    /// Store `hash` and report whether it differs from the previous one.
    /// A binding without a previous hash counts as changed.
    pub fn update(&mut self, binding: &str, hash: &str) -> bool {
        let changed = self.load(binding) != Some(hash);
        if changed {
            self.map.insert(binding.to_string(), hash.to_string());
            info!(binding = %binding, hash = %hash, "stored binding hash");
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn aggregate_is_order_independent_and_path_sensitive() {
        let a = ("a.js".to_string(), "1".to_string());
        let b = ("b.js".to_string(), "2".to_string());
        assert_eq!(
            compute_aggregate_hash(&[a.clone(), b.clone()]),
            compute_aggregate_hash(&[b.clone(), a.clone()])
        );
        let renamed = ("c.js".to_string(), "2".to_string());
        assert_ne!(
            compute_aggregate_hash(&[a.clone(), b]),
            compute_aggregate_hash(&[a, renamed])
        );
    }

    #[test]
    fn tree_hash_tracks_contents() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/dist/index.html", "a");
        fs.add_file("/p/dist/assets/x.css", "b");
        let first = compute_tree_hash(&fs, Path::new("/p/dist")).unwrap();
        assert_eq!(first, compute_tree_hash(&fs, Path::new("/p/dist")).unwrap());

        fs.add_file("/p/dist/assets/x.css", "c");
        assert_ne!(first, compute_tree_hash(&fs, Path::new("/p/dist")).unwrap());

        assert_eq!(
            compute_tree_hash(&fs, Path::new("/p/missing")).unwrap(),
            compute_aggregate_hash(&[])
        );
    }

    #[test]
    fn store_reports_changes_only() {
        let mut store = MemoryHashStore::new();
        assert!(store.update("style", "h1"));
        assert!(!store.update("style", "h1"));
        assert!(store.update("style", "h2"));
        assert_eq!(store.load("style"), Some("h2"));
    }

    #[cfg(unix)]
    #[test]
    fn tree_hash_terminates_on_symlink_cycles() {
        use crate::fs::RealFileSystem;

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("dist/assets")).unwrap();
        std::fs::write(dir.path().join("dist/index.html"), "a").unwrap();
        std::os::unix::fs::symlink(dir.path().join("dist"), dir.path().join("dist/assets/up")).unwrap();

        assert!(compute_tree_hash(&RealFileSystem, &dir.path().join("dist")).is_ok());
    }
}
