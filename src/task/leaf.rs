// src/task/leaf.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::engine::TaskName;
use crate::errors::TaskError;
use crate::fileset::{FileSet, SourceSpec};
use crate::task::{Task, TaskContext, TaskFuture};
use crate::transform::{AssetFile, TransformRef};
use crate::watch::path_utils::url_path;

/// Source -> transforms -> destination.
#[derive(Debug)]
pub struct LeafTask {
    name: TaskName,
    source: SourceSpec,
    transforms: Vec<TransformRef>,
    dest: String,
}

impl LeafTask {
    pub fn builder(name: impl Into<TaskName>) -> LeafTaskBuilder {
        LeafTaskBuilder {
            name: name.into(),
            source: None,
            transforms: Vec::new(),
            dest: None,
        }
    }

    pub fn dest(&self) -> &str {
        &self.dest
    }
}

#[derive(Debug)]
pub struct LeafTaskBuilder {
    name: TaskName,
    source: Option<SourceSpec>,
    transforms: Vec<TransformRef>,
    dest: Option<String>,
}

impl LeafTaskBuilder {
    pub fn source(mut self, source: SourceSpec) -> Self {
        self.source = Some(source);
        self
    }

    /// Append one transform; transforms run in the order they were added.
    pub fn transform(mut self, transform: TransformRef) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Destination directory, relative to the project root.
    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn build(self) -> Result<LeafTask, TaskError> {
        let source = self.source.ok_or_else(|| TaskError::Construction {
            task: self.name.clone(),
            message: "no source declared".to_string(),
        })?;
        let dest = self
            .dest
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| TaskError::Construction {
                task: self.name.clone(),
                message: "no destination declared; every leaf task must write to an explicit directory"
                    .to_string(),
            })?;
        Ok(LeafTask {
            name: self.name,
            source,
            transforms: self.transforms,
            dest,
        })
    }
}

impl Task for LeafTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> String {
        let mut parts = vec![self.source.patterns().join(", ")];
        parts.extend(self.transforms.iter().map(|t| t.name().to_string()));
        parts.push(self.dest.clone());
        parts.join(" -> ")
    }

    fn run(self: Arc<Self>, ctx: TaskContext) -> TaskFuture {
        Box::pin(async move {
            let inputs = read_sources(&self.name, &ctx, &self.source).await?;
            debug!(task = %self.name, files = inputs.len(), "resolved sources");

            let mut outputs = Vec::with_capacity(inputs.len());
            for (origin, file) in inputs {
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

/// Resolve and read a source set off the async scheduler.
///
/// Returns `(root-relative source path, file)` pairs; the file's `relative`
/// is its path under the base.
pub(crate) async fn read_sources(
    task: &str,
    ctx: &TaskContext,
    source: &SourceSpec,
) -> Result<Vec<(PathBuf, AssetFile)>, TaskError> {
    let fs = Arc::clone(&ctx.fs);
    let root = ctx.root.clone();
    let source = source.clone();

    let joined = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<(PathBuf, AssetFile)>> {
        let mut files = Vec::new();
        for entry in FileSet::resolve(fs.as_ref(), &root, &source) {
            let entry = entry?;
            let contents = fs.read(&entry.source)?;
            let origin = Path::new(source.base()).join(&entry.relative);
            files.push((origin, AssetFile::new(entry.relative, contents)));
        }
        Ok(files)
    })
    .await;

    match joined {
        Ok(result) => result.map_err(|e| TaskError::fs(task, e)),
        Err(err) => Err(TaskError::Aborted {
            task: task.to_string(),
            message: err.to_string(),
        }),
    }
}

/// Apply `transforms` in order. `None` means a transform dropped the file.
pub(crate) async fn apply_transforms(
    task: &str,
    transforms: &[TransformRef],
    origin: &Path,
    mut file: AssetFile,
) -> Result<Option<AssetFile>, TaskError> {
    for transform in transforms {
        match transform.apply(file).await {
            Ok(Some(next)) => file = next,
            Ok(None) => return Ok(None),
            Err(err) => {
                return Err(TaskError::Transform {
                    task: task.to_string(),
                    transform: transform.name().to_string(),
                    path: origin.to_path_buf(),
                    message: format!("{err:#}"),
                });
            }
        }
    }
    Ok(Some(file))
}

/// Write files under `dest` and return their URL paths.
pub(crate) async fn write_outputs(
    task: &str,
    ctx: &TaskContext,
    dest: &str,
    files: Vec<AssetFile>,
) -> Result<Vec<String>, TaskError> {
    let fs = Arc::clone(&ctx.fs);
    let dest_dir = ctx.path(dest);

    let joined = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<String>> {
        let mut written = Vec::with_capacity(files.len());
        for file in files {
            fs.write(&dest_dir.join(&file.relative), &file.contents)?;
            written.push(url_path(&file.relative));
        }
        Ok(written)
    })
    .await;

    match joined {
        Ok(result) => result.map_err(|e| TaskError::fs(task, e)),
        Err(err) => Err(TaskError::Aborted {
            task: task.to_string(),
            message: err.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::fs::FileSystem;
    use crate::transform::builtin::{Passthrough, Sass};
    use crate::transform::{DropMatching, SetExtension};
    use crate::types::ParallelPolicy;
    use regex::Regex;

    fn ctx(fs: &MockFileSystem) -> TaskContext {
        TaskContext::new("/p", Arc::new(fs.clone()), ParallelPolicy::WaitAll)
    }

    fn style_task() -> Arc<LeafTask> {
        Arc::new(
            LeafTask::builder("style")
                .source(SourceSpec::new(["src/assets/styles/*.scss"], "src").unwrap())
                .transform(Arc::new(DropMatching::new(Regex::new("^_").unwrap())))
                .transform(Arc::new(Sass::new("/p/src")))
                .transform(Arc::new(SetExtension::new("scss", "css")))
                .dest("temp")
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn destination_is_mandatory() {
        let err = LeafTask::builder("script")
            .source(SourceSpec::new(["src/*.js"], "src").unwrap())
            .transform(Arc::new(Passthrough::new("babel")))
            .build()
            .unwrap_err();
        assert!(matches!(err, TaskError::Construction { ref task, .. } if task == "script"));

        let err = LeafTask::builder("x").dest("temp").build().unwrap_err();
        assert!(err.to_string().contains("no source"));
    }

    #[tokio::test]
    async fn compiles_into_destination_keeping_base_relative_paths() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/assets/styles/a.scss", "$c: red; body{color:$c}");
        fs.add_file("/p/src/assets/styles/_vars.scss", "$x: 1px;");

        style_task().run(ctx(&fs)).await.unwrap();

        let css = fs.read(Path::new("/p/temp/assets/styles/a.css")).unwrap();
        assert!(String::from_utf8(css).unwrap().contains("body {\n  color: red;\n}"));
        assert!(!fs.exists(Path::new("/p/temp/assets/styles/_vars.css")));
    }

    #[tokio::test]
    async fn transform_failure_names_task_transform_and_file() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/assets/styles/bad.scss", "body { color: red;");

        let err = style_task().run(ctx(&fs)).await.unwrap_err();
        match err {
            TaskError::Transform {
                task,
                transform,
                path,
                message,
            } => {
                assert_eq!(task, "style");
                assert_eq!(transform, "sass");
                assert_eq!(path, PathBuf::from("src/assets/styles/bad.scss"));
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!fs.exists(Path::new("/p/temp")));
    }

    #[tokio::test]
    async fn empty_source_set_succeeds_vacuously() {
        let fs = MockFileSystem::new();
        style_task().run(ctx(&fs)).await.unwrap();
        assert!(fs.paths().is_empty());
    }

    #[test]
    fn describe_lists_the_chain() {
        let task = style_task();
        assert_eq!(
            task.describe(),
            "src/assets/styles/*.scss -> drop(^_) -> sass -> rename(.scss -> .css) -> temp"
        );
    }
}
