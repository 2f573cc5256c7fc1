#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pageflow::errors::TaskError;
use pageflow::task::{Task, TaskContext, TaskFuture, TaskRef};

/// Shared record of task completions, in completion order.
pub type RunLog = Arc<Mutex<Vec<String>>>;

pub fn run_log() -> RunLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// A task with scripted latency and outcome that writes one marker file.
#[derive(Debug)]
pub struct ScriptedTask {
    name: String,
    delay: Duration,
    fail: bool,
    panic: bool,
    output: Option<String>,
    log: RunLog,
}

impl ScriptedTask {
    pub fn new(name: &str, log: &RunLog) -> Self {
        Self {
            name: name.to_string(),
            delay: Duration::ZERO,
            fail: false,
            panic: false,
            output: None,
            log: Arc::clone(log),
        }
    }

    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    pub fn fails(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Record the run, then panic.
    pub fn panics(mut self) -> Self {
        self.panic = true;
        self
    }

    /// Root-relative file written (with the task name) on success.
    pub fn writes(mut self, rel: &str) -> Self {
        self.output = Some(rel.to_string());
        self
    }

    pub fn into_ref(self) -> TaskRef {
        Arc::new(self)
    }
}

impl Task for ScriptedTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe(&self) -> String {
        format!("scripted({}ms)", self.delay.as_millis())
    }

    fn run(self: Arc<Self>, ctx: TaskContext) -> TaskFuture {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.log.lock().unwrap().push(self.name.clone());
            if self.panic {
                panic!("{} exploded", self.name);
            }
            if self.fail {
                return Err(TaskError::Construction {
                    task: self.name.clone(),
                    message: "scripted failure".to_string(),
                });
            }
            if let Some(rel) = &self.output {
                ctx.fs
                    .write(&ctx.path(rel), self.name.as_bytes())
                    .map_err(|e| TaskError::fs(self.name.clone(), e))?;
            }
            Ok(())
        })
    }
}

/// A task that panics when run.
#[derive(Debug)]
pub struct PanickingTask(pub String);

impl Task for PanickingTask {
    fn name(&self) -> &str {
        &self.0
    }

    fn describe(&self) -> String {
        "panics".to_string()
    }

    fn run(self: Arc<Self>, _ctx: TaskContext) -> TaskFuture {
        Box::pin(async move {
            if !self.0.is_empty() {
                panic!("{} exploded", self.0);
            }
            Ok::<(), TaskError>(())
        })
    }
}
