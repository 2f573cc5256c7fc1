// src/fs/mock.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use parking_lot::Mutex;

use super::FileSystem;

/// In-memory filesystem for tests.
///
/// Only files are stored; a directory exists while at least one file lives
/// below it. Use absolute paths (e.g. `/project/src/index.html`).
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<BTreeMap<PathBuf, Vec<u8>>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.files
            .lock()
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    /// All stored file paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().keys().cloned().collect()
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files
            .lock()
            .keys()
            .any(|p| p != path && p.starts_with(path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.files.lock();
        let mut children = BTreeSet::new();
        for p in files.keys() {
            if p == path {
                continue;
            }
            if let Ok(rest) = p.strip_prefix(path) {
                if let Some(first) = rest.components().next() {
                    children.insert(path.join(first));
                }
            }
        }
        if children.is_empty() {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        Ok(children.into_iter().collect())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        self.files
            .lock()
            .retain(|p, _| !p.starts_with(path));
        Ok(())
    }
}
