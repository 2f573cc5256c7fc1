// src/exec/mod.rs

//! Execution layer.
//!
//! - [`command`] runs external compiler processes with
//!   `tokio::process::Command`.
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `RealExecutorBackend` that the watch runtime uses in production, and
//!   which tests replace with a fake implementation.

pub mod backend;
pub mod command;

pub use backend::{ExecutorBackend, RealExecutorBackend, WatchAction};
pub use command::run_filter;
