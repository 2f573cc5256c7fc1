// src/task/clean.rs

use std::sync::Arc;

use tracing::info;

use crate::engine::TaskName;
use crate::errors::TaskError;
use crate::task::{Task, TaskContext, TaskFuture};

/// Remove output directories. Missing directories are a no-op.
#[derive(Debug)]
pub struct CleanTask {
    name: TaskName,
    dirs: Vec<String>,
}

impl CleanTask {
    pub fn new(name: impl Into<TaskName>, dirs: Vec<String>) -> Self {
        Self {
            name: name.into(),
            dirs,
        }
    }
}

impl Task for CleanTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> String {
        format!("remove {}", self.dirs.join(", "))
    }

    fn run(self: Arc<Self>, ctx: TaskContext) -> TaskFuture {
        Box::pin(async move {
            let fs = Arc::clone(&ctx.fs);
            let targets: Vec<_> = self.dirs.iter().map(|d| ctx.path(d)).collect();

            let joined = tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
                for dir in &targets {
                    fs.remove_dir_all(dir)?;
                }
                Ok(())
            })
            .await;

            match joined {
                Ok(result) => result.map_err(|e| TaskError::fs(self.name.clone(), e))?,
                Err(err) => {
                    return Err(TaskError::Aborted {
                        task: self.name.clone(),
                        message: err.to_string(),
                    });
                }
            }
            info!(task = %self.name, dirs = ?self.dirs, "removed output directories");
            Ok(())
        })
    }
}
