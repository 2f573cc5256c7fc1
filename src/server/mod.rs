// src/server/mod.rs

//! Live-reload development server.
//!
//! - [`broadcaster`] owns the client sessions and pushes reload signals.
//! - [`static_files`] maps request paths onto the served roots.
//! - [`dev_server`] is the axum app: event stream, client script, files.

pub mod broadcaster;
pub mod dev_server;
pub mod static_files;

pub use broadcaster::{ReloadBroadcaster, ReloadSignal};
pub use dev_server::{DevServer, ServerHandle, ServerOptions};
