// src/pipeline/mod.rs

//! The declared task graph.

pub mod registry;

pub use registry::PipelineRegistry;
