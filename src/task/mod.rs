// src/task/mod.rs

//! Tasks and their composition.
//!
//! A [`Task`] is an asynchronous unit of build work that completes exactly
//! once with success or a [`TaskError`]. Leaf tasks read a [`FileSet`],
//! run it through transforms and write to an explicit destination;
//! [`combinator::series`] and [`combinator::parallel`] compose tasks into
//! the pipeline graph.
//!
//! [`FileSet`]: crate::fileset::FileSet

pub mod bundle;
pub mod clean;
pub mod combinator;
pub mod leaf;
pub mod serve;

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::errors::TaskError;
use crate::fs::FileSystem;
use crate::server::ReloadBroadcaster;
use crate::types::ParallelPolicy;

pub use bundle::UserefTask;
pub use clean::CleanTask;
pub use combinator::{parallel, series};
pub use leaf::{LeafTask, LeafTaskBuilder};
pub use serve::ServeTask;

pub type TaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send>>;

pub trait Task: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Start the task. Every call is an independent run.
    fn run(self: Arc<Self>, ctx: TaskContext) -> TaskFuture;

    /// One-line description for `--dry-run`.
    fn describe(&self) -> String;

    /// Composite children, in declared order.
    fn children(&self) -> &[TaskRef] {
        &[]
    }
}

pub type TaskRef = Arc<dyn Task>;

/// Environment shared by every task of one process.
#[derive(Clone)]
pub struct TaskContext {
    /// Project root; every configured path is relative to it.
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    /// Failure rule applied by every `parallel` composite.
    pub policy: ParallelPolicy,
    /// Set while the dev server runs; leaf tasks report written files to it.
    pub reloader: Option<Arc<ReloadBroadcaster>>,
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("root", &self.root)
            .field("policy", &self.policy)
            .field("reloader", &self.reloader.is_some())
            .finish_non_exhaustive()
    }
}

impl TaskContext {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>, policy: ParallelPolicy) -> Self {
        Self {
            root: root.into(),
            fs,
            policy,
            reloader: None,
        }
    }

    pub fn with_reloader(mut self, reloader: Arc<ReloadBroadcaster>) -> Self {
        self.reloader = Some(reloader);
        self
    }

    /// Absolute path of a root-relative directory.
    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    /// Tell connected browsers which URL paths were rewritten.
    pub fn notify_changed(&self, url_paths: &[String]) {
        if let Some(reloader) = &self.reloader {
            reloader.notify_changed(url_paths);
        }
    }
}

/// Run `task` with start/finish logging.
pub async fn run_task(task: &TaskRef, ctx: &TaskContext) -> Result<(), TaskError> {
    let name = task.name().to_string();
    let started = Instant::now();
    info!(task = %name, "task started");

    let result = Arc::clone(task).run(ctx.clone()).await;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(()) => info!(task = %name, elapsed_ms, "task finished"),
        Err(err) => debug!(task = %name, elapsed_ms, error = %err, "task failed"),
    }
    result
}

/// Run `task` on its own Tokio task so that a panic is reported as a
/// failure of that task instead of unwinding through its parent.
pub async fn run_isolated(task: TaskRef, ctx: TaskContext) -> Result<(), TaskError> {
    let name = task.name().to_string();
    match tokio::spawn(async move { run_task(&task, &ctx).await }).await {
        Ok(result) => result,
        Err(err) => Err(TaskError::Aborted {
            task: name,
            message: if err.is_panic() {
                "task panicked".to_string()
            } else {
                err.to_string()
            },
        }),
    }
}

/// Render the declared graph below `task`, one task per line.
pub fn render_tree(task: &TaskRef) -> String {
    let mut out = String::new();
    render_node(task, 0, &mut out);
    out
}

fn render_node(task: &TaskRef, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(task.name());
    out.push_str(": ");
    out.push_str(&task.describe());
    out.push('\n');
    for child in task.children() {
        render_node(child, depth + 1, out);
    }
}
