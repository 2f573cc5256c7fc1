// src/errors.rs

//! Crate-wide error types.
//!
//! - [`TaskError`] is what a task run reports. It is carried unchanged
//!   through `series`/`parallel` composites, so it always names the leaf
//!   task that originally failed.
//! - [`PageflowError`] covers everything around task execution: config,
//!   patterns, the dev server.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::TaskName;

#[derive(Error, Debug)]
pub enum TaskError {
    /// A leaf compiler/minifier rejected its input.
    #[error("task '{task}': transform '{transform}' failed on {path:?}: {message}")]
    Transform {
        task: TaskName,
        transform: String,
        path: PathBuf,
        message: String,
    },

    /// Reading sources, writing outputs or removing directories failed.
    #[error("task '{task}': {source:#}")]
    Fs {
        task: TaskName,
        #[source]
        source: anyhow::Error,
    },

    /// The task was declared incorrectly (e.g. no destination).
    #[error("task '{task}' is misconfigured: {message}")]
    Construction { task: TaskName, message: String },

    /// The dev server could not be started or failed while running.
    #[error("task '{task}': server error: {message}")]
    Server { task: TaskName, message: String },

    /// A child future panicked or was aborted before reporting.
    #[error("task '{task}' aborted: {message}")]
    Aborted { task: TaskName, message: String },
}

impl TaskError {
    /// Name of the task where the failure originated.
    pub fn task(&self) -> &str {
        match self {
            TaskError::Transform { task, .. }
            | TaskError::Fs { task, .. }
            | TaskError::Construction { task, .. }
            | TaskError::Server { task, .. }
            | TaskError::Aborted { task, .. } => task,
        }
    }

    pub fn fs(task: impl Into<TaskName>, source: anyhow::Error) -> Self {
        TaskError::Fs {
            task: task.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum PageflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid glob pattern: {0}")]
    GlobError(#[from] globset::Error),

    #[error("Unknown task: {0}")]
    TaskNotFound(String),

    #[error(transparent)]
    TaskFailed(#[from] TaskError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PageflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_error_reports_originating_task() {
        let err = TaskError::Transform {
            task: "style".into(),
            transform: "sass".into(),
            path: PathBuf::from("assets/styles/a.scss"),
            message: "unclosed block".into(),
        };
        assert_eq!(err.task(), "style");
        let text = err.to_string();
        assert!(text.contains("style"));
        assert!(text.contains("sass"));
        assert!(text.contains("unclosed block"));
    }

    #[test]
    fn task_error_converts_into_crate_error() {
        let err: PageflowError = TaskError::Construction {
            task: "script".into(),
            message: "no destination".into(),
        }
        .into();
        assert!(matches!(err, PageflowError::TaskFailed(ref e) if e.task() == "script"));
    }
}
