// src/engine/queue.rs

use std::collections::HashSet;

use tracing::debug;

use super::BindingName;

/// Running / pending bookkeeping per binding.
///
/// Semantics:
/// - `try_start` on an idle binding marks it running and returns `true`.
/// - `try_start` on a running binding records one pending re-run and
///   returns `false`; repeated triggers coalesce into that single re-run.
/// - `finish` clears the running mark; if a re-run was pending, the binding
///   is immediately marked running again and `finish` returns `true`.
#[derive(Debug, Default)]
pub struct BindingQueue {
    running: HashSet<BindingName>,
    pending: HashSet<BindingName>,
}

impl BindingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_start(&mut self, binding: &str) -> bool {
        if self.running.contains(binding) {
            let fresh = self.pending.insert(binding.to_string());
            debug!(binding = %binding, coalesced = !fresh, "binding busy; re-run pending");
            return false;
        }
        self.running.insert(binding.to_string());
        true
    }

    pub fn finish(&mut self, binding: &str) -> bool {
        if self.pending.remove(binding) {
            // Stays in `running`: the re-run starts right away.
            debug!(binding = %binding, "starting pending re-run");
            return true;
        }
        self.running.remove(binding);
        false
    }

    pub fn is_running(&self, binding: &str) -> bool {
        self.running.contains(binding)
    }

    pub fn is_pending(&self, binding: &str) -> bool {
        self.pending.contains(binding)
    }

    /// No binding is running and none is pending.
    pub fn is_idle(&self) -> bool {
        self.running.is_empty() && self.pending.is_empty()
    }
}
