// src/task/bundle.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use tracing::{debug, info};

use crate::engine::TaskName;
use crate::errors::TaskError;
use crate::fileset::SourceSpec;
use crate::fs::FileSystem;
use crate::task::leaf::{apply_transforms, read_sources, write_outputs};
use crate::task::{Task, TaskContext, TaskFuture};
use crate::transform::useref::{has_parent_segment, Bundle, BuildBlocks};
use crate::transform::{AssetFile, TransformRef};

const TRANSFORM_NAME: &str = "useref";

/// Resolve HTML build blocks into concatenated bundles, then run the
/// transforms over pages and bundles alike.
#[derive(Debug)]
pub struct UserefTask {
    name: TaskName,
    source: SourceSpec,
    search_paths: Vec<String>,
    transforms: Vec<TransformRef>,
    dest: String,
    blocks: BuildBlocks,
}

impl UserefTask {
    pub fn new(
        name: impl Into<TaskName>,
        source: SourceSpec,
        search_paths: Vec<String>,
        transforms: Vec<TransformRef>,
        dest: impl Into<String>,
    ) -> Result<Self, TaskError> {
        let name = name.into();
        let blocks = BuildBlocks::new().map_err(|e| TaskError::Construction {
            task: name.clone(),
            message: e.to_string(),
        })?;
        Ok(Self {
            name,
            source,
            search_paths,
            transforms,
            dest: dest.into(),
            blocks,
        })
    }
}

impl Task for UserefTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> String {
        let mut parts = vec![
            self.source.patterns().join(", "),
            format!("useref(search: {})", self.search_paths.join(", ")),
        ];
        parts.extend(self.transforms.iter().map(|t| t.name().to_string()));
        parts.push(self.dest.clone());
        parts.join(" -> ")
    }

    fn run(self: Arc<Self>, ctx: TaskContext) -> TaskFuture {
        Box::pin(async move {
            let pages = read_sources(&self.name, &ctx, &self.source).await?;

            let mut files = Vec::with_capacity(pages.len());
            // bundle path -> (declaring page, bundle)
            let mut bundles: BTreeMap<String, (PathBuf, Bundle)> = BTreeMap::new();
            for (origin, page) in pages {
                let html = String::from_utf8_lossy(&page.contents);
                let rewritten = self
                    .blocks
                    .rewrite(&html)
                    .map_err(|e| self.transform_error(&origin, e))?;
                for bundle in rewritten.bundles {
                    bundles
                        .entry(bundle.path.clone())
                        .or_insert_with(|| (origin.clone(), bundle));
                }
                files.push((origin, AssetFile::new(page.relative, rewritten.html)));
            }
            debug!(task = %self.name, bundles = bundles.len(), "collected build blocks");

            for (origin, bundle) in bundles.into_values() {
                let fs = Arc::clone(&ctx.fs);
                let root = ctx.root.clone();
                let search = self.search_paths.clone();
                let target = bundle.path.clone();
                let joined =
                    tokio::task::spawn_blocking(move || concat_bundle(fs.as_ref(), &root, &search, &bundle))
                        .await;
                let contents = match joined {
                    Ok(result) => result.map_err(|e| self.transform_error(&origin, e))?,
                    Err(err) => {
                        return Err(TaskError::Aborted {
                            task: self.name.clone(),
                            message: err.to_string(),
                        });
                    }
                };
                files.push((origin, AssetFile::new(target, contents)));
            }

            let mut outputs = Vec::with_capacity(files.len());
            for (origin, file) in files {
                if let Some(out) = apply_transforms(&self.name, &self.transforms, &origin, file).await? {
                    outputs.push(out);
                }
            }

            let written = write_outputs(&self.name, &ctx, &self.dest, outputs).await?;
            info!(task = %self.name, files = written.len(), dest = %self.dest, "outputs written");
            ctx.notify_changed(&written);
            Ok(())
        })
    }
}

impl UserefTask {
    fn transform_error(&self, origin: &Path, err: anyhow::Error) -> TaskError {
        TaskError::Transform {
            task: self.name.clone(),
            transform: TRANSFORM_NAME.to_string(),
            path: origin.to_path_buf(),
            message: format!("{err:#}"),
        }
    }
}

/// Read every source of `bundle` from the first search path holding it and
/// join the contents with `\n`.
fn concat_bundle(
    fs: &dyn FileSystem,
    root: &Path,
    search_paths: &[String],
    bundle: &Bundle,
) -> Result<Vec<u8>> {
    let mut out: Vec<u8> = Vec::new();
    for (idx, reference) in bundle.sources.iter().enumerate() {
        if has_parent_segment(reference) {
            bail!(
                "'{reference}' referenced by bundle '{}' must stay inside the search paths",
                bundle.path
            );
        }
        let rel = reference.trim_start_matches('/');
        let found = search_paths
            .iter()
            .map(|dir| root.join(dir).join(rel))
            .find(|candidate| fs.is_file(candidate))
            .ok_or_else(|| {
                anyhow!(
                    "'{reference}' referenced by bundle '{}' not found in any of: {}",
                    bundle.path,
                    search_paths.join(", ")
                )
            })?;
        if idx > 0 {
            out.push(b'\n');
        }
        out.extend(fs.read(&found)?);
    }
    Ok(out)
}
