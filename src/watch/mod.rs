// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling the glob patterns of each watch binding.
//! - Wiring up a cross-platform filesystem watcher (`notify`) and grouping
//!   raw events into debounced change batches.
//! - Optionally hashing watched content so that touching a file without
//!   changing it does not re-run anything.
//!
//! It does **not** know what a binding does; it only turns filesystem
//! changes into binding-level triggers for the engine.

pub mod cache;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use hash::{compute_tree_hash, MemoryHashStore};
pub use patterns::{bindings_for_paths, WatchBinding};
pub use watcher::{spawn_watcher, WatchOptions, WatcherHandle};
