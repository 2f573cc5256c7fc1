// src/transform/registry.rs

//! Capability name -> transform implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::errors::{PageflowError, Result};
use crate::transform::builtin::{builtin, CAPABILITIES};
use crate::transform::external::ExternalCommand;
use crate::transform::TransformRef;

/// Explicitly populated table of named transforms.
///
/// Nothing is discovered implicitly: every entry comes from a
/// [`register`](Self::register) call, either from
/// [`with_builtins`](Self::with_builtins) or by the caller.
#[derive(Debug, Default, Clone)]
pub struct TransformRegistry {
    transforms: HashMap<String, TransformRef>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the built-in capabilities, then replace those named in
    /// `[compilers]` with external commands run in `root`.
    pub fn with_builtins(config: &Config, root: &Path) -> Result<Self> {
        let mut registry = Self::new();
        for name in CAPABILITIES {
            let transform = builtin(name, config, root)?
                .ok_or_else(|| PageflowError::ConfigError(format!("no built-in for '{name}'")))?;
            registry.register(*name, transform);
        }

        for (name, cmd) in &config.compilers {
            info!(capability = %name, cmd = %cmd, "using external compiler");
            registry.register(
                name.clone(),
                Arc::new(ExternalCommand::new(name.clone(), cmd.clone(), root.to_path_buf())),
            );
        }
        Ok(registry)
    }

    /// Add or replace a transform. Returns the one it replaced, if any.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        transform: TransformRef,
    ) -> Option<TransformRef> {
        let name = name.into();
        debug!(capability = %name, transform = %transform.name(), "registering transform");
        self.transforms.insert(name, transform)
    }

    pub fn get(&self, name: &str) -> Option<TransformRef> {
        self.transforms.get(name).cloned()
    }

    /// Like [`get`](Self::get) but a missing name is a configuration error.
    pub fn require(&self, name: &str) -> Result<TransformRef> {
        self.get(name).ok_or_else(|| {
            PageflowError::ConfigError(format!("no transform registered for capability '{name}'"))
        })
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.transforms.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
