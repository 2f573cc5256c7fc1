// src/transform/mod.rs

//! Per-file transforms.
//!
//! A [`Transform`] maps one in-memory [`AssetFile`] to zero or one output
//! file. Leaf tasks apply their transforms left to right; a file dropped by
//! one transform is never seen by the next.
//!
//! - [`registry`] maps capability names (`sass`, `babel`, ...) to
//!   implementations, populated by explicit registration.
//! - [`builtin`] holds the built-in compilers and minifiers.
//! - [`external`] runs a configured shell command as a compiler.
//! - [`useref`] resolves HTML build blocks into bundles.

pub mod builtin;
pub mod external;
pub mod registry;
pub mod useref;

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use regex::Regex;

pub use registry::TransformRegistry;

/// A file travelling through a task's transform chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    /// Output path relative to the task's destination root.
    pub relative: PathBuf,
    pub contents: Vec<u8>,
}

impl AssetFile {
    pub fn new(relative: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            relative: relative.into(),
            contents: contents.into(),
        }
    }

    /// Relative path with forward slashes, used for regex conditions.
    pub fn relative_str(&self) -> String {
        self.relative.to_string_lossy().replace('\\', "/")
    }

    pub fn extension(&self) -> Option<&str> {
        self.relative.extension().and_then(|e| e.to_str())
    }
}

pub type TransformFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<AssetFile>>> + Send + 'a>>;

/// Content-level mapping applied to each file of a task.
///
/// Returning `Ok(None)` drops the file.
pub trait Transform: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn apply<'a>(&'a self, file: AssetFile) -> TransformFuture<'a>;
}

pub type TransformRef = Arc<dyn Transform>;

/// Apply `inner` only to files whose relative path matches `pattern`;
/// everything else passes through untouched.
#[derive(Debug)]
pub struct When {
    pattern: Regex,
    inner: TransformRef,
    name: String,
}

impl When {
    pub fn new(pattern: Regex, inner: TransformRef) -> Self {
        let name = format!("when({}, {})", pattern.as_str(), inner.name());
        Self {
            pattern,
            inner,
            name,
        }
    }
}

impl Transform for When {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply<'a>(&'a self, file: AssetFile) -> TransformFuture<'a> {
        Box::pin(async move {
            if self.pattern.is_match(&file.relative_str()) {
                self.inner.apply(file).await
            } else {
                Ok(Some(file))
            }
        })
    }
}

/// Drop files whose file name matches `pattern` (e.g. sass partials).
#[derive(Debug)]
pub struct DropMatching {
    pattern: Regex,
    name: String,
}

impl DropMatching {
    pub fn new(pattern: Regex) -> Self {
        let name = format!("drop({})", pattern.as_str());
        Self { pattern, name }
    }
}

impl Transform for DropMatching {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply<'a>(&'a self, file: AssetFile) -> TransformFuture<'a> {
        Box::pin(async move {
            let file_name = file
                .relative
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if self.pattern.is_match(&file_name) {
                Ok(None)
            } else {
                Ok(Some(file))
            }
        })
    }
}

/// Rename files with extension `from` to extension `to`.
#[derive(Debug)]
pub struct SetExtension {
    from: String,
    to: String,
    name: String,
}

impl SetExtension {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        let to = to.into();
        let name = format!("rename(.{from} -> .{to})");
        Self { from, to, name }
    }
}

impl Transform for SetExtension {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply<'a>(&'a self, mut file: AssetFile) -> TransformFuture<'a> {
        Box::pin(async move {
            if file.extension() == Some(self.from.as_str()) {
                file.relative.set_extension(&self.to);
            }
            Ok(Some(file))
        })
    }
}

/// Whether `path` has one of the given extensions.
pub fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| exts.contains(&e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::builtin::Passthrough;

    #[derive(Debug)]
    struct Upper;

    impl Transform for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn apply<'a>(&'a self, mut file: AssetFile) -> TransformFuture<'a> {
            Box::pin(async move {
                file.contents = file.contents.to_ascii_uppercase();
                Ok(Some(file))
            })
        }
    }

    #[tokio::test]
    async fn when_only_touches_matching_paths() {
        let t = When::new(Regex::new(r"\.js$").unwrap(), Arc::new(Upper));

        let js = t.apply(AssetFile::new("a/app.js", "let x")).await.unwrap().unwrap();
        assert_eq!(js.contents, b"LET X");

        let css = t.apply(AssetFile::new("a/app.css", "a{}")).await.unwrap().unwrap();
        assert_eq!(css.contents, b"a{}");
        assert_eq!(t.name(), r"when(\.js$, upper)");
    }

    #[tokio::test]
    async fn drop_and_rename() {
        let drop = DropMatching::new(Regex::new("^_").unwrap());
        assert!(drop.apply(AssetFile::new("styles/_vars.scss", "")).await.unwrap().is_none());
        assert!(drop.apply(AssetFile::new("_dir/main.scss", "")).await.unwrap().is_some());

        let rename = SetExtension::new("scss", "css");
        let out = rename.apply(AssetFile::new("styles/main.scss", "")).await.unwrap().unwrap();
        assert_eq!(out.relative, PathBuf::from("styles/main.css"));
        let out = rename.apply(AssetFile::new("styles/x.txt", "")).await.unwrap().unwrap();
        assert_eq!(out.relative, PathBuf::from("styles/x.txt"));
    }

    #[tokio::test]
    async fn passthrough_keeps_bytes() {
        let p = Passthrough::new("imagemin");
        let bytes = vec![0u8, 159, 146, 150];
        let out = p.apply(AssetFile::new("logo.png", bytes.clone())).await.unwrap().unwrap();
        assert_eq!(out.contents, bytes);
    }
}
