use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use pageflow::engine::{BindingName, BindingOutcome, RuntimeEvent};
use pageflow::errors::Result;
use pageflow::exec::ExecutorBackend;

/// A fake executor that:
/// - records which bindings were dispatched
/// - reports BindingCompleted(Success) after `delay` (zero by default).
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    delay: Duration,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            delay: Duration::ZERO,
        }
    }

    /// Keep each dispatched binding "running" for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn dispatch(
        &mut self,
        binding: BindingName,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let delay = self.delay;

        Box::pin(async move {
            executed.lock().unwrap().push(binding.clone());

            tokio::spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let _ = tx
                    .send(RuntimeEvent::BindingCompleted {
                        binding,
                        outcome: BindingOutcome::Success,
                    })
                    .await;
            });
            Ok(())
        })
    }
}
