// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{merge, Config, RawConfig};
use crate::config::validate::validate_config;
use crate::errors::{PageflowError, Result};

/// Name of the optional config file looked up in the invocation directory.
pub const DEFAULT_CONFIG_FILE: &str = "pages.toml";

/// Read the config file at `path`, if there is one.
///
/// A missing file is `Ok(None)`. A file that exists but cannot be read or
/// parsed is an error.
pub fn load_optional(path: impl AsRef<Path>) -> Result<Option<RawConfig>> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(?path, "no config file; using built-in defaults");
        return Ok(None);
    }

    let contents = fs::read_to_string(path)?;
    let raw: RawConfig = toml::from_str(&contents)?;
    Ok(Some(raw))
}

/// Load the optional file, merge it over the defaults and validate the
/// result.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config> {
    let raw = load_optional(&path)?;
    let config = merge(Config::default(), raw);
    validate_config(&config)?;
    Ok(config)
}

/// Like [`load_and_validate`], but the file must exist. Used for a config
/// named explicitly with `--config`.
pub fn load_required(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(PageflowError::ConfigError(format!(
            "config file {} does not exist",
            path.display()
        )));
    }
    load_and_validate(path)
}

/// Resolve the config path for a project root: an explicit `--config` wins,
/// relative paths are taken relative to the project root.
pub fn resolve_config_path(project_root: &Path, explicit: Option<&str>) -> PathBuf {
    match explicit {
        Some(p) => {
            let p = PathBuf::from(p);
            if p.is_absolute() { p } else { project_root.join(p) }
        }
        None => project_root.join(DEFAULT_CONFIG_FILE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_and_validate(dir.path().join("pages.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_required(dir.path().join("site.toml")).unwrap_err();
        assert!(matches!(err, PageflowError::ConfigError(ref m) if m.contains("site.toml")));

        // A directory is not a config file either.
        assert!(load_required(dir.path()).is_err());
    }

    #[test]
    fn required_file_is_merged_like_the_default_one() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[server]\nport = 4000\n").unwrap();
        let cfg = load_required(file.path()).unwrap();
        assert_eq!(cfg.server.port, 4000);
        assert_eq!(cfg.paths, Config::default().paths);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[server\nport = ").unwrap();
        let err = load_and_validate(file.path()).unwrap_err();
        assert!(matches!(err, PageflowError::TomlError(_)));
    }

    #[test]
    fn explicit_relative_config_is_resolved_against_root() {
        let root = Path::new("/project");
        assert_eq!(
            resolve_config_path(root, Some("conf/site.toml")),
            PathBuf::from("/project/conf/site.toml")
        );
        assert_eq!(
            resolve_config_path(root, None),
            PathBuf::from("/project/pages.toml")
        );
    }
}
