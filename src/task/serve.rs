// src/task/serve.rs

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, TaskName};
use crate::errors::TaskError;
use crate::exec::{RealExecutorBackend, WatchAction};
use crate::server::{DevServer, ReloadBroadcaster, ServerOptions};
use crate::task::{Task, TaskContext, TaskFuture};
use crate::watch::{spawn_watcher, WatchBinding, WatchOptions};

/// Dev server plus watcher. Runs until Ctrl-C.
///
/// Failures of tasks triggered by the watcher are logged and the binding
/// stays active; only failing to start the server or the watcher fails
/// this task.
#[derive(Debug)]
pub struct ServeTask {
    name: TaskName,
    server: ServerOptions,
    watch: WatchOptions,
    bindings: Vec<(WatchBinding, WatchAction)>,
}

impl ServeTask {
    pub fn new(
        name: impl Into<TaskName>,
        server: ServerOptions,
        watch: WatchOptions,
        bindings: Vec<(WatchBinding, WatchAction)>,
    ) -> Self {
        Self {
            name: name.into(),
            server,
            watch,
            bindings,
        }
    }

    pub fn bindings(&self) -> &[(WatchBinding, WatchAction)] {
        &self.bindings
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve_until<F>(&self, ctx: TaskContext, shutdown: F) -> Result<(), TaskError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let broadcaster = Arc::new(ReloadBroadcaster::new());
        let server = DevServer::new(self.server.clone(), Arc::clone(&ctx.fs), Arc::clone(&broadcaster))
            .start()
            .await
            .map_err(|e| self.server_error(e))?;

        let ctx = ctx.with_reloader(Arc::clone(&broadcaster));
        let (runtime_tx, runtime_rx) = mpsc::channel::<RuntimeEvent>(64);

        let watch_bindings: Vec<WatchBinding> = self.bindings.iter().map(|(b, _)| b.clone()).collect();
        let actions: HashMap<String, WatchAction> = self
            .bindings
            .iter()
            .map(|(b, a)| (b.name().to_string(), a.clone()))
            .collect();

        let watcher = match spawn_watcher(
            ctx.root.clone(),
            Arc::clone(&ctx.fs),
            watch_bindings.clone(),
            runtime_tx.clone(),
            self.watch,
        ) {
            Ok(handle) => handle,
            Err(e) => {
                if let Err(stop_err) = server.stop().await {
                    warn!(error = %stop_err, "failed to stop dev server");
                }
                return Err(self.server_error(e));
            }
        };

        {
            let tx = runtime_tx.clone();
            tokio::spawn(async move {
                shutdown.await;
                let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
            });
        }

        let core = CoreRuntime::new(watch_bindings.iter().map(|b| b.name().to_string()));
        let executor = RealExecutorBackend::new(actions, ctx, runtime_tx);
        info!(task = %self.name, addr = %server.addr(), "watching for changes; press Ctrl-C to stop");

        let result = Runtime::new(core, runtime_rx, executor).run().await;

        drop(watcher);
        let stopped = server.stop().await;
        result.map_err(|e| self.server_error(e.into()))?;
        stopped.map_err(|e| self.server_error(e))
    }

    fn server_error(&self, err: anyhow::Error) -> TaskError {
        TaskError::Server {
            task: self.name.clone(),
            message: format!("{err:#}"),
        }
    }
}

impl Task for ServeTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> String {
        let watched: Vec<String> = self
            .bindings
            .iter()
            .map(|(b, a)| format!("{} => {a:?}", b.name()))
            .collect();
        format!(
            "serve {} on {}:{} (watch: {})",
            self.server.roots.join(", "),
            self.server.host,
            self.server.port,
            watched.join(", ")
        )
    }

    fn run(self: Arc<Self>, ctx: TaskContext) -> TaskFuture {
        Box::pin(async move {
            self.serve_until(ctx, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("failed to listen for Ctrl+C: {e}");
                    std::future::pending::<()>().await;
                }
            })
            .await
        })
    }
}
