// src/engine/mod.rs

//! Watch-mode orchestration engine.
//!
//! The watcher turns file changes into binding triggers; this module decides
//! when each binding's action actually runs:
//! - a binding never runs twice at the same time;
//! - a trigger that arrives while the binding is running is remembered as one
//!   pending re-run (further triggers coalesce into it);
//! - different bindings run concurrently.
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Name of a watch binding (`style`, `script`, `page`, `assets`).
pub type BindingName = String;

/// Outcome of one invocation of a binding's action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingOutcome {
    Success,
    Failed(String),
}

/// Why a binding was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Triggered programmatically (tests, startup).
    Manual,
    /// Triggered due to a filesystem change batch.
    FileWatch,
}

/// Events flowing into the runtime from the watcher and the executor.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    BindingTriggered {
        binding: BindingName,
        reason: TriggerReason,
    },
    BindingCompleted {
        binding: BindingName,
        outcome: BindingOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use self::core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::BindingQueue;
pub use runtime::Runtime;
