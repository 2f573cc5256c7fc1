// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::engine::BindingName;
use crate::fileset::{literal_prefix, FileSet, SourceSpec};
use crate::fs::FileSystem;

/// Compiled glob patterns for one watch binding.
///
/// Patterns are relative to the project root; the watcher passes relative
/// paths (e.g. `"src/assets/scripts/app.js"`) into [`matches`](Self::matches).
#[derive(Clone)]
pub struct WatchBinding {
    name: BindingName,
    spec: SourceSpec,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("name", &self.name)
            .field("patterns", &self.spec.patterns())
            .finish()
    }
}

impl WatchBinding {
    pub fn new<I, S>(name: impl Into<BindingName>, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let spec = SourceSpec::new(patterns, "")
            .with_context(|| format!("building watch globset for binding {name}"))?;
        Ok(Self { name, spec })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn patterns(&self) -> &[String] {
        self.spec.patterns()
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.spec.matches(rel_path)
    }
}

/// Bindings interested in at least one of `rel_paths`, each listed once, in
/// declaration order.
pub fn bindings_for_paths<'a>(
    bindings: &'a [WatchBinding],
    rel_paths: &[String],
) -> Vec<&'a WatchBinding> {
    bindings
        .iter()
        .filter(|b| rel_paths.iter().any(|p| b.matches(p)))
        .collect()
}

/// All files under `root` matching the binding's patterns. Used for
/// content hashing.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    binding: &WatchBinding,
) -> Result<Vec<PathBuf>> {
    FileSet::resolve(fs, root, &binding.spec)
        .map(|entry| entry.map(|e| e.source))
        .collect()
}

/// Directories to register with the OS watcher: the literal prefix of each
/// pattern, nested ones removed.
pub fn watch_roots(root: &Path, bindings: &[WatchBinding]) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = Vec::new();
    for pattern in bindings.iter().flat_map(|b| b.patterns()) {
        let mut dir = literal_prefix(pattern);
        // A fully literal pattern names a file; watch its directory.
        if dir.as_os_str() == pattern.as_str() {
            dir.pop();
        }
        let dir = root.join(dir);
        if roots.iter().any(|r| dir.starts_with(r)) {
            continue;
        }
        roots.retain(|r| !r.starts_with(&dir));
        roots.push(dir);
    }
    roots
}
