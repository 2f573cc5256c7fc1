// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, info, warn};

use crate::engine::queue::BindingQueue;
use crate::engine::{BindingName, BindingOutcome, TriggerReason};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Run this binding's action now.
    Dispatch(BindingName),
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle a binding trigger: dispatch it if idle, otherwise record one
/// pending re-run.
pub fn handle_binding_trigger(
    queue: &mut BindingQueue,
    binding: BindingName,
    reason: TriggerReason,
) -> CoreStep {
    debug!(binding = %binding, ?reason, "binding triggered");
    if queue.try_start(&binding) {
        CoreStep::running(vec![CoreCommand::Dispatch(binding)])
    } else {
        CoreStep::running(Vec::new())
    }
}

/// Handle completion of a binding's action.
///
/// A failed action is logged and otherwise ignored: the binding stays
/// active and its next trigger runs it again.
pub fn handle_binding_completion(
    queue: &mut BindingQueue,
    binding: BindingName,
    outcome: BindingOutcome,
) -> CoreStep {
    match &outcome {
        BindingOutcome::Success => info!(binding = %binding, "watch action finished"),
        BindingOutcome::Failed(message) => warn!(
            binding = %binding,
            error = %message,
            "watch action failed; binding stays active"
        ),
    }

    let mut commands = Vec::new();
    if queue.finish(&binding) {
        commands.push(CoreCommand::Dispatch(binding));
    }
    CoreStep::running(commands)
}
