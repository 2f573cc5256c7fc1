// src/transform/builtin/sass.rs

//! Built-in `sass` capability on top of `grass`.
//!
//! Output uses the expanded style. Imports (`@import`, `@use`, `@forward`)
//! resolve against the importing file's directory first, then the source
//! root, so `_partials` next to a stylesheet are found without
//! configuration.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use crate::transform::{AssetFile, Transform, TransformFuture};

#[derive(Debug, Clone)]
pub struct Sass {
    /// Directory the file's `relative` path is rooted at (the task's base).
    source_root: PathBuf,
}

impl Sass {
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
        }
    }

    fn load_paths(&self, relative: &Path) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(2);
        if let Some(parent) = relative.parent().filter(|p| !p.as_os_str().is_empty()) {
            paths.push(self.source_root.join(parent));
        }
        paths.push(self.source_root.clone());
        paths
    }
}

impl Transform for Sass {
    fn name(&self) -> &str {
        "sass"
    }

    fn apply<'a>(&'a self, mut file: AssetFile) -> TransformFuture<'a> {
        Box::pin(async move {
            let source = String::from_utf8(file.contents)
                .map_err(|_| anyhow!("stylesheet is not valid UTF-8"))?;
            let load_paths = self.load_paths(&file.relative);
            file.contents = compile(&source, &load_paths)?.into_bytes();
            Ok(Some(file))
        })
    }
}

/// Compile SCSS source to expanded CSS.
pub fn compile(source: &str, load_paths: &[PathBuf]) -> Result<String> {
    let options = load_paths
        .iter()
        .fold(grass::Options::default().style(grass::OutputStyle::Expanded), |opts, p| {
            opts.load_path(p)
        });
    grass::from_string(source.to_owned(), &options).map_err(|e| anyhow!("{e}"))
}
