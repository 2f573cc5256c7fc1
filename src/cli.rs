// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `pageflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pageflow",
    version,
    about = "Build static pages and serve them with live reload.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML), relative to the project root.
    ///
    /// Default: `pages.toml`. A missing file means built-in defaults.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<String>,

    /// Project root.
    #[arg(long, value_name = "DIR", default_value = ".", global = true)]
    pub cwd: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PAGEFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Print the task graph of the command and exit without running it.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Remove the temp and dist directories.
    Clean,
    /// Clean, then produce the minified production tree.
    Build,
    /// Compile into temp, then serve it with live reload until Ctrl-C.
    Develop {
        /// Dev server port (overrides `[server].port`).
        #[arg(long)]
        port: Option<u16>,
    },
}

impl Command {
    /// Registry task the command runs.
    pub fn task_name(&self) -> &'static str {
        match self {
            Command::Clean => "clean",
            Command::Build => "build",
            Command::Develop { .. } => "develop",
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
