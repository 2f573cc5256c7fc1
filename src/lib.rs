// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fileset;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod task;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::{load_and_validate, load_required, resolve_config_path, validate_config, Config};
use crate::fs::RealFileSystem;
use crate::pipeline::PipelineRegistry;
use crate::task::{render_tree, run_task, TaskContext};
use crate::transform::TransformRegistry;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (`pages.toml` merged over defaults)
/// - transform registration and the declared pipeline
/// - running the requested task (or printing it with `--dry-run`)
pub async fn run(args: CliArgs) -> Result<()> {
    let root = project_root(&args)?;
    let config = load_config(&root, &args)?;

    let transforms = TransformRegistry::with_builtins(&config, &root)?;
    let pipeline = PipelineRegistry::from_config(&config, &transforms, &root)?;
    let task = pipeline.get(args.command.task_name())?;

    if args.dry_run {
        println!("pageflow dry-run ({})", root.display());
        println!("  parallel_policy = {}", config.build.parallel_policy);
        println!();
        print!("{}", render_tree(&task));
        debug!("dry-run complete (no execution)");
        return Ok(());
    }

    let ctx = TaskContext::new(
        root,
        Arc::new(RealFileSystem),
        config.build.parallel_policy,
    );
    info!(task = %task.name(), root = %ctx.root.display(), "running");

    if let Err(err) = run_task(&task, &ctx).await {
        let origin = err.task().to_string();
        return Err(anyhow::Error::new(err)
            .context(format!("'{}' failed in task '{origin}'", task.name())));
    }
    Ok(())
}

fn project_root(args: &CliArgs) -> Result<PathBuf> {
    args.cwd
        .canonicalize()
        .with_context(|| format!("project root {:?} does not exist", args.cwd))
}

fn load_config(root: &std::path::Path, args: &CliArgs) -> Result<Config> {
    let path = resolve_config_path(root, args.config.as_deref());
    // Only the implicit pages.toml may be absent.
    let loaded = if args.config.is_some() {
        load_required(&path)
    } else {
        load_and_validate(&path)
    };
    let mut config = loaded.with_context(|| format!("loading config {}", path.display()))?;

    if let Command::Develop { port: Some(port) } = args.command {
        config.server.port = port;
        validate_config(&config)?;
    }
    debug!(?config, "effective configuration");
    Ok(config)
}
