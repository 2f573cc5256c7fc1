// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of running actions
//! itself. This makes it easy to swap in a fake executor in tests while
//! keeping the production implementation here.
//!
//! - `RealExecutorBackend` runs the task bound to a watch binding (or
//!   broadcasts a reload) on its own Tokio task and reports back with
//!   `RuntimeEvent::BindingCompleted`.
//! - Tests provide their own `ExecutorBackend` that records which bindings
//!   were dispatched and emits completions directly.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{BindingName, BindingOutcome, RuntimeEvent};
use crate::errors::{PageflowError, Result};
use crate::task::{run_isolated, TaskContext, TaskRef};

/// Trait abstracting how a triggered binding is executed.
pub trait ExecutorBackend: Send {
    /// Start the binding's action. The implementation must eventually send
    /// `RuntimeEvent::BindingCompleted` for it.
    fn dispatch(
        &mut self,
        binding: BindingName,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// What a watch binding does when it fires.
#[derive(Clone)]
pub enum WatchAction {
    /// Run a task; its successful completion notifies the reload broadcaster.
    RunTask(TaskRef),
    /// Tell every connected browser to reload.
    Reload,
}

impl fmt::Debug for WatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchAction::RunTask(task) => write!(f, "RunTask({})", task.name()),
            WatchAction::Reload => write!(f, "Reload"),
        }
    }
}

/// Real executor backend used in `develop`.
pub struct RealExecutorBackend {
    actions: Arc<HashMap<BindingName, WatchAction>>,
    ctx: TaskContext,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl fmt::Debug for RealExecutorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealExecutorBackend")
            .field("actions", &self.actions)
            .finish_non_exhaustive()
    }
}

impl RealExecutorBackend {
    pub fn new(
        actions: HashMap<BindingName, WatchAction>,
        ctx: TaskContext,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            actions: Arc::new(actions),
            ctx,
            runtime_tx,
        }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn dispatch(
        &mut self,
        binding: BindingName,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let action = self.actions.get(&binding).cloned();
        let ctx = self.ctx.clone();
        let runtime_tx = self.runtime_tx.clone();

        Box::pin(async move {
            let action = action.ok_or_else(|| PageflowError::TaskNotFound(binding.clone()))?;
            debug!(binding = %binding, ?action, "running watch action");

            tokio::spawn(async move {
                let outcome = match action {
                    WatchAction::RunTask(task) => match run_isolated(task, ctx.clone()).await {
                        Ok(()) => BindingOutcome::Success,
                        Err(err) => BindingOutcome::Failed(err.to_string()),
                    },
                    WatchAction::Reload => {
                        if let Some(reloader) = &ctx.reloader {
                            reloader.reload();
                        }
                        BindingOutcome::Success
                    }
                };

                if let Err(err) = runtime_tx
                    .send(RuntimeEvent::BindingCompleted { binding, outcome })
                    .await
                {
                    warn!("failed to send RuntimeEvent::BindingCompleted: {err}");
                }
            });
            Ok(())
        })
    }
}
