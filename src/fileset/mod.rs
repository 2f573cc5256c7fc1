// src/fileset/mod.rs

//! FileSet resolution: glob patterns + a base directory -> lazily walked
//! sequence of `(source path, relative output path)` entries.
//!
//! Patterns are relative to the project root and matched with forward
//! slashes, the same way the watcher matches change events. The relative
//! output path is always computed against the declared base, so
//! `src/assets/styles/*.scss` with base `src` lands at
//! `<dest>/assets/styles/*.css` no matter how deep the glob starts.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::fs::FileSystem;
use crate::watch::path_utils::relative_str;

/// One matched source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path of the matched file.
    pub source: PathBuf,
    /// Path relative to the declared base; this is where the file lands
    /// under the destination root.
    pub relative: PathBuf,
}

/// Declared source side of a task: include patterns plus a base directory.
///
/// Patterns are compiled once when the task is declared; matching against
/// the filesystem happens anew on every [`FileSet::resolve`].
#[derive(Clone)]
pub struct SourceSpec {
    patterns: Vec<String>,
    base: String,
    matcher: GlobSet,
}

impl fmt::Debug for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceSpec")
            .field("patterns", &self.patterns)
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl SourceSpec {
    pub fn new<I, S>(patterns: I, base: impl Into<String>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let matcher = build_matcher(&patterns)?;
        Ok(Self {
            patterns,
            base: base.into(),
            matcher,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Whether a root-relative path (forward slashes) matches any pattern.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }
}

/// Compile include patterns. `*` does not cross `/`; `**` does.
pub fn build_matcher(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .map_err(|e| anyhow!("invalid glob pattern {pat:?}: {e}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Longest leading run of pattern components without glob metacharacters.
///
/// `src/assets/styles/*.scss` -> `src/assets/styles`; `*.html` -> ``.
pub fn literal_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    for part in pattern.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part.contains(['*', '?', '[', '{']) {
            break;
        }
        prefix.push(part);
    }
    prefix
}

/// Lazily walked file set.
///
/// Iteration is depth-first over sorted directory entries starting from the
/// literal prefix of each pattern, so the order is deterministic. A walk
/// root that does not exist contributes nothing.
pub struct FileSet<'a> {
    fs: &'a dyn FileSystem,
    root: PathBuf,
    base: PathBuf,
    spec: &'a SourceSpec,
    queue: VecDeque<PathBuf>,
    seen: HashSet<PathBuf>,
    /// Canonical directories already expanded; a symlink back into one of
    /// them is not followed again.
    visited_dirs: HashSet<PathBuf>,
}

impl fmt::Debug for FileSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSet")
            .field("root", &self.root)
            .field("base", &self.base)
            .field("spec", self.spec)
            .finish_non_exhaustive()
    }
}

impl<'a> FileSet<'a> {
    /// Start resolving `spec` against the live filesystem under `root`.
    pub fn resolve(fs: &'a dyn FileSystem, root: &Path, spec: &'a SourceSpec) -> Self {
        let mut walk_roots: Vec<PathBuf> = Vec::new();
        for pat in spec.patterns() {
            let start = root.join(literal_prefix(pat));
            // A root nested inside another root would be walked twice.
            if walk_roots.iter().any(|r| start.starts_with(r)) {
                continue;
            }
            walk_roots.retain(|r| !r.starts_with(&start));
            walk_roots.push(start);
        }

        let queue = walk_roots
            .into_iter()
            .filter(|p| fs.exists(p))
            .collect();

        Self {
            fs,
            root: root.to_path_buf(),
            base: root.join(spec.base()),
            spec,
            queue,
            seen: HashSet::new(),
            visited_dirs: HashSet::new(),
        }
    }

    fn entry_for(&self, path: &Path) -> Result<FileEntry> {
        let relative = path.strip_prefix(&self.base).map_err(|_| {
            anyhow!(
                "matched file {:?} lies outside the base directory {:?}",
                path,
                self.base
            )
        })?;
        Ok(FileEntry {
            source: path.to_path_buf(),
            relative: relative.to_path_buf(),
        })
    }
}

impl Iterator for FileSet<'_> {
    type Item = Result<FileEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(path) = self.queue.pop_front() {
            if self.fs.is_dir(&path) {
                let canonical = self.fs.canonicalize(&path).unwrap_or_else(|_| path.clone());
                if !self.visited_dirs.insert(canonical) {
                    debug!(dir = ?path, "directory already walked; not following");
                    continue;
                }
                match self.fs.read_dir(&path) {
                    Ok(children) => {
                        for child in children.into_iter().rev() {
                            self.queue.push_front(child);
                        }
                    }
                    Err(e) => return Some(Err(e)),
                }
                continue;
            }

            if !self.fs.is_file(&path) {
                continue;
            }

            let Some(rel) = relative_str(&self.root, &path) else {
                continue;
            };
            if !self.spec.matches(&rel) || !self.seen.insert(path.clone()) {
                continue;
            }

            return Some(self.entry_for(&path));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn project() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/index.html", "<html></html>");
        fs.add_file("/p/src/about.html", "<html></html>");
        fs.add_file("/p/src/assets/styles/main.scss", "body{}");
        fs.add_file("/p/src/assets/styles/_vars.scss", "$c: red;");
        fs.add_file("/p/src/assets/styles/deep/nested.scss", "a{}");
        fs.add_file("/p/src/assets/images/logo.png", [1u8, 2, 3]);
        fs.add_file("/p/src/assets/images/icons/x.svg", "<svg/>");
        fs.add_file("/p/node_modules/pkg/index.js", "x");
        fs
    }

    fn relatives(set: FileSet<'_>) -> Vec<String> {
        set.map(|e| e.unwrap().relative.to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn single_star_stays_in_one_directory() {
        let fs = project();
        let spec = SourceSpec::new(["src/assets/styles/*.scss"], "src").unwrap();
        let got = relatives(FileSet::resolve(&fs, Path::new("/p"), &spec));
        assert_eq!(
            got,
            vec!["assets/styles/_vars.scss", "assets/styles/main.scss"]
        );
    }

    #[test]
    fn double_star_recurses_and_skips_directories() {
        let fs = project();
        let spec = SourceSpec::new(["src/assets/images/**"], "src").unwrap();
        let got = relatives(FileSet::resolve(&fs, Path::new("/p"), &spec));
        assert_eq!(
            got,
            vec!["assets/images/icons/x.svg", "assets/images/logo.png"]
        );
    }

    #[test]
    fn relative_path_is_computed_against_base_not_glob_parent() {
        let fs = project();
        let spec = SourceSpec::new(["src/*.html"], "src").unwrap();
        let got = relatives(FileSet::resolve(&fs, Path::new("/p"), &spec));
        assert_eq!(got, vec!["about.html", "index.html"]);

        let spec = SourceSpec::new(["src/assets/images/icons/*.svg"], "src").unwrap();
        let got = relatives(FileSet::resolve(&fs, Path::new("/p"), &spec));
        assert_eq!(got, vec!["assets/images/icons/x.svg"]);
    }

    #[test]
    fn missing_walk_root_yields_empty_set() {
        let fs = project();
        let spec = SourceSpec::new(["public/**"], "public").unwrap();
        assert!(FileSet::resolve(&fs, Path::new("/p"), &spec).next().is_none());
    }

    #[test]
    fn overlapping_patterns_yield_each_file_once() {
        let fs = project();
        let spec =
            SourceSpec::new(["src/assets/**", "src/assets/styles/*.scss"], "src").unwrap();
        let got = relatives(FileSet::resolve(&fs, Path::new("/p"), &spec));
        assert_eq!(got.len(), 5);
        let unique: HashSet<_> = got.iter().collect();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn file_outside_base_is_an_error() {
        let fs = project();
        let spec = SourceSpec::new(["node_modules/pkg/*.js"], "src").unwrap();
        let first = FileSet::resolve(&fs, Path::new("/p"), &spec).next().unwrap();
        assert!(first.is_err());
    }

    #[test]
    fn literal_prefix_stops_at_first_glob_component() {
        assert_eq!(literal_prefix("src/assets/styles/*.scss"), PathBuf::from("src/assets/styles"));
        assert_eq!(literal_prefix("public/**"), PathBuf::from("public"));
        assert_eq!(literal_prefix("*.html"), PathBuf::new());
        assert_eq!(literal_prefix("src/index.html"), PathBuf::from("src/index.html"));
    }

    #[test]
    fn invalid_pattern_is_rejected_at_declaration() {
        assert!(SourceSpec::new(["src/[.scss"], "src").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycles_are_walked_once() {
        use crate::fs::RealFileSystem;

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("assets")).unwrap();
        std::fs::write(src.join("assets/a.css"), "a{}").unwrap();
        std::os::unix::fs::symlink(&src, src.join("assets/loop")).unwrap();

        let spec = SourceSpec::new(["src/**/*.css"], "src").unwrap();
        let got = relatives(FileSet::resolve(&RealFileSystem, dir.path(), &spec));
        assert_eq!(got, vec!["assets/a.css"]);
    }
}
