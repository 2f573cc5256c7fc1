// src/config/validate.rs

use crate::config::model::Config;
use crate::errors::{PageflowError, Result};
use crate::transform::builtin::CAPABILITIES;

/// Run semantic validation against a merged configuration.
///
/// This checks:
/// - all `[paths]` entries are non-empty
/// - the output roots (`temp`, `dist`) differ from each other and from the
///   source roots, so `clean` can never delete sources
/// - `[server].port` is not 0 and route prefixes start with `/`
/// - `[compilers]` only names known capabilities, with non-empty commands
pub fn validate_config(cfg: &Config) -> Result<()> {
    validate_paths(cfg)?;
    validate_server(cfg)?;
    validate_compilers(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> PageflowError {
    PageflowError::ConfigError(msg.into())
}

fn validate_paths(cfg: &Config) -> Result<()> {
    let p = &cfg.paths;
    for (key, value) in [
        ("src", &p.src),
        ("public", &p.public),
        ("temp", &p.temp),
        ("dist", &p.dist),
    ] {
        if value.trim().is_empty() {
            return Err(config_error(format!("[paths].{key} must not be empty")));
        }
    }

    let norm = |s: &str| s.trim().trim_end_matches('/').to_string();

    if norm(&p.temp) == norm(&p.dist) {
        return Err(config_error(format!(
            "[paths].temp and [paths].dist must differ (both are '{}')",
            p.temp
        )));
    }

    for (out_key, out) in [("temp", &p.temp), ("dist", &p.dist)] {
        for (in_key, input) in [("src", &p.src), ("public", &p.public)] {
            if norm(out) == norm(input) {
                return Err(config_error(format!(
                    "[paths].{out_key} must not be the same directory as [paths].{in_key} ('{out}')"
                )));
            }
        }
    }

    Ok(())
}

fn validate_server(cfg: &Config) -> Result<()> {
    if cfg.server.port == 0 {
        return Err(config_error("[server].port must be >= 1 (got 0)"));
    }

    for (prefix, dir) in cfg.server.routes.iter() {
        if !prefix.starts_with('/') {
            return Err(config_error(format!(
                "[server].routes key '{prefix}' must start with '/'"
            )));
        }
        if dir.trim().is_empty() {
            return Err(config_error(format!(
                "[server].routes entry '{prefix}' has an empty directory"
            )));
        }
    }

    Ok(())
}

fn validate_compilers(cfg: &Config) -> Result<()> {
    for (name, cmd) in cfg.compilers.iter() {
        if !CAPABILITIES.contains(&name.as_str()) {
            return Err(config_error(format!(
                "[compilers] names unknown capability '{name}' (known: {})",
                CAPABILITIES.join(", ")
            )));
        }
        if cmd.trim().is_empty() {
            return Err(config_error(format!(
                "[compilers].{name} must not be an empty command"
            )));
        }
    }
    Ok(())
}
