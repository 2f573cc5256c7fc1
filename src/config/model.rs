// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::ParallelPolicy;

/// Configuration as read from `pages.toml`.
///
/// Every top-level key is optional; a key that is present replaces the
/// built-in default for that key wholesale (see [`merge`]).
///
/// ```toml
/// [data]
/// title = "Home"
/// menus = ["Home", "About"]
///
/// [server]
/// port = 3000
///
/// [compilers]
/// babel = "npx babel --presets @babel/preset-env"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    /// Opaque template data handed to the `swig` transform.
    #[serde(default)]
    pub data: Option<toml::Table>,

    #[serde(default)]
    pub paths: Option<PathsSection>,

    #[serde(default)]
    pub server: Option<ServerSection>,

    #[serde(default)]
    pub build: Option<BuildSection>,

    #[serde(default)]
    pub watch: Option<WatchSection>,

    /// Capability name -> shell command that replaces the built-in compiler.
    #[serde(default)]
    pub compilers: Option<BTreeMap<String, String>>,
}

/// Effective configuration after merging the file over the defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data: toml::Table,
    pub paths: PathsSection,
    pub server: ServerSection,
    pub build: BuildSection,
    pub watch: WatchSection,
    pub compilers: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: toml::Table::new(),
            paths: PathsSection::default(),
            server: ServerSection::default(),
            build: BuildSection::default(),
            watch: WatchSection::default(),
            compilers: BTreeMap::new(),
        }
    }
}

/// `[paths]`: the stable filesystem layout, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_src")]
    pub src: String,
    #[serde(default = "default_public")]
    pub public: String,
    #[serde(default = "default_temp")]
    pub temp: String,
    #[serde(default = "default_dist")]
    pub dist: String,
}

fn default_src() -> String {
    "src".to_string()
}

fn default_public() -> String {
    "public".to_string()
}

fn default_temp() -> String {
    "temp".to_string()
}

fn default_dist() -> String {
    "dist".to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            src: default_src(),
            public: default_public(),
            temp: default_temp(),
            dist: default_dist(),
        }
    }
}

/// `[server]`: dev server address and route aliases.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// URL prefix -> directory (relative to the project root) served
    /// without copying it into the source tree.
    #[serde(default = "default_routes")]
    pub routes: BTreeMap<String, String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    2080
}

fn default_routes() -> BTreeMap<String, String> {
    let mut routes = BTreeMap::new();
    routes.insert("/node_modules".to_string(), "node_modules".to_string());
    routes
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            routes: default_routes(),
        }
    }
}

/// `[build]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BuildSection {
    #[serde(default)]
    pub parallel_policy: ParallelPolicy,
}

/// `[watch]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatchSection {
    /// Window used to collect raw filesystem events into one change batch.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Skip a binding when the content of its watched files is unchanged.
    #[serde(default)]
    pub use_hash: bool,
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            use_hash: false,
        }
    }
}

/// Shallow merge: each top-level key present in `external` replaces the
/// default value for that key; absent keys keep the defaults.
///
/// `external` is `None` when no config file exists.
pub fn merge(defaults: Config, external: Option<RawConfig>) -> Config {
    let Some(ext) = external else {
        return defaults;
    };

    Config {
        data: ext.data.unwrap_or(defaults.data),
        paths: ext.paths.unwrap_or(defaults.paths),
        server: ext.server.unwrap_or(defaults.server),
        build: ext.build.unwrap_or(defaults.build),
        watch: ext.watch.unwrap_or(defaults.watch),
        compilers: ext.compilers.unwrap_or(defaults.compilers),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_without_file_keeps_defaults() {
        let merged = merge(Config::default(), None);
        assert_eq!(merged, Config::default());
        assert_eq!(merged.server.port, 2080);
        assert_eq!(
            merged.server.routes.get("/node_modules").map(String::as_str),
            Some("node_modules")
        );
    }

    #[test]
    fn present_keys_replace_defaults_wholesale() {
        let mut defaults = Config::default();
        defaults.data.insert("title".into(), toml::Value::String("default".into()));
        defaults.data.insert("year".into(), toml::Value::Integer(2020));

        let raw: RawConfig = toml::from_str(
            r#"
[data]
title = "Mine"

[server]
port = 3000
"#,
        )
        .unwrap();

        let merged = merge(defaults, Some(raw));

        // `data` is replaced, not deep-merged.
        assert_eq!(merged.data.get("title").and_then(|v| v.as_str()), Some("Mine"));
        assert!(merged.data.get("year").is_none());

        assert_eq!(merged.server.port, 3000);
        assert_eq!(merged.server.host, "127.0.0.1");
        assert_eq!(merged.paths, PathsSection::default());
    }

    #[test]
    fn parallel_policy_is_read_from_build_section() {
        let raw: RawConfig = toml::from_str(
            r#"
[build]
parallel_policy = "fail-fast"
"#,
        )
        .unwrap();
        let merged = merge(Config::default(), Some(raw));
        assert_eq!(merged.build.parallel_policy, ParallelPolicy::FailFast);
    }
}
