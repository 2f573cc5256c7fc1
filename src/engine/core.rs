// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) reads events from channels,
//! hands `Dispatch` commands to the executor backend and handles shutdown.
//! The core has no Tokio types and performs no IO, so it is unit tested
//! directly.

use std::collections::HashSet;

use tracing::warn;

use crate::engine::event_handlers::{handle_binding_completion, handle_binding_trigger, CoreStep};
use crate::engine::queue::BindingQueue;
use crate::engine::{BindingName, RuntimeEvent};

#[derive(Debug)]
pub struct CoreRuntime {
    known: HashSet<BindingName>,
    queue: BindingQueue,
}

impl CoreRuntime {
    pub fn new<I>(bindings: I) -> Self
    where
        I: IntoIterator<Item = BindingName>,
    {
        Self {
            known: bindings.into_iter().collect(),
            queue: BindingQueue::new(),
        }
    }

    /// No binding is running or pending (for tests).
    pub fn is_idle(&self) -> bool {
        self.queue.is_idle()
    }

    pub fn is_running(&self, binding: &str) -> bool {
        self.queue.is_running(binding)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::BindingTriggered { binding, reason } => {
                if !self.known.contains(&binding) {
                    warn!(binding = %binding, "trigger for unknown binding ignored");
                    return CoreStep::running(Vec::new());
                }
                handle_binding_trigger(&mut self.queue, binding, reason)
            }
            RuntimeEvent::BindingCompleted { binding, outcome } => {
                handle_binding_completion(&mut self.queue, binding, outcome)
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}
