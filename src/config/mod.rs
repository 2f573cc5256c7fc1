// src/config/mod.rs

//! Configuration loading and validation for pageflow.
//!
//! Responsibilities:
//! - Define the TOML-backed data model and the pure default merge (`model.rs`).
//! - Load the optional config file from disk (`loader.rs`).
//! - Validate path layout, server and compiler settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    load_and_validate, load_optional, load_required, resolve_config_path, DEFAULT_CONFIG_FILE,
};
pub use model::{
    merge, BuildSection, Config, PathsSection, RawConfig, ServerSection, WatchSection,
};
pub use validate::validate_config;
