// src/task/combinator.rs

//! `series` and `parallel` composites.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::engine::TaskName;
use crate::errors::TaskError;
use crate::task::{run_isolated, Task, TaskContext, TaskFuture, TaskRef};
use crate::types::ParallelPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Series,
    Parallel,
}

/// Ordered child list plus a mode.
#[derive(Debug)]
pub struct CompositeTask {
    name: TaskName,
    mode: Mode,
    children: Vec<TaskRef>,
}

impl CompositeTask {
    pub fn mode(&self) -> Mode {
        self.mode
    }
}

/// Run `children` one after another; the first failure stops the rest.
pub fn series(name: impl Into<TaskName>, children: Vec<TaskRef>) -> TaskRef {
    Arc::new(CompositeTask {
        name: name.into(),
        mode: Mode::Series,
        children,
    })
}

/// Run `children` concurrently under the context's [`ParallelPolicy`].
pub fn parallel(name: impl Into<TaskName>, children: Vec<TaskRef>) -> TaskRef {
    Arc::new(CompositeTask {
        name: name.into(),
        mode: Mode::Parallel,
        children,
    })
}

impl Task for CompositeTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> String {
        let names: Vec<&str> = self.children.iter().map(|c| c.name()).collect();
        match self.mode {
            Mode::Series => format!("series({})", names.join(", ")),
            Mode::Parallel => format!("parallel({})", names.join(", ")),
        }
    }

    fn children(&self) -> &[TaskRef] {
        &self.children
    }

    fn run(self: Arc<Self>, ctx: TaskContext) -> TaskFuture {
        Box::pin(async move {
            match self.mode {
                Mode::Series => run_series(&self.name, &self.children, ctx).await,
                Mode::Parallel => run_parallel(&self.name, &self.children, ctx).await,
            }
        })
    }
}

async fn run_series(name: &str, children: &[TaskRef], ctx: TaskContext) -> Result<(), TaskError> {
    for (idx, child) in children.iter().enumerate() {
        if let Err(err) = run_isolated(Arc::clone(child), ctx.clone()).await {
            let skipped = children.len() - idx - 1;
            debug!(composite = %name, failed = %err.task(), skipped, "series stopped");
            return Err(err);
        }
    }
    Ok(())
}

async fn run_parallel(name: &str, children: &[TaskRef], ctx: TaskContext) -> Result<(), TaskError> {
    let policy = ctx.policy;
    let mut set = JoinSet::new();
    for child in children {
        set.spawn(run_isolated(Arc::clone(child), ctx.clone()));
    }

    let mut first: Option<TaskError> = None;
    while let Some(joined) = set.join_next().await {
        // run_isolated already turns panics into TaskError::Aborted.
        let result = match joined {
            Ok(result) => result,
            Err(err) => Err(TaskError::Aborted {
                task: name.to_string(),
                message: err.to_string(),
            }),
        };
        let Err(err) = result else {
            continue;
        };

        match policy {
            ParallelPolicy::FailFast => {
                let detached = set.len();
                set.detach_all();
                debug!(composite = %name, failed = %err.task(), detached, "parallel failed fast");
                return Err(err);
            }
            ParallelPolicy::WaitAll => {
                if first.is_none() {
                    first = Some(err);
                } else {
                    warn!(composite = %name, error = %err, "additional parallel failure");
                }
            }
        }
    }

    match first {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
