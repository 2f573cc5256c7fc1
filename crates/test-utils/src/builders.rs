#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pageflow::config::{Config, PathsSection};
use pageflow::fs::RealFileSystem;
use pageflow::pipeline::PipelineRegistry;
use pageflow::task::TaskContext;
use pageflow::transform::TransformRegistry;
use pageflow::types::ParallelPolicy;
use tempfile::TempDir;

/// Builder for a project directory on disk.
pub struct ProjectBuilder {
    files: Vec<(String, Vec<u8>)>,
    dirs: Vec<String>,
}

impl ProjectBuilder {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            dirs: Vec::new(),
        }
    }

    pub fn dir(mut self, rel: &str) -> Self {
        self.dirs.push(rel.to_string());
        self
    }

    pub fn file(mut self, rel: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files.push((rel.to_string(), contents.into()));
        self
    }

    /// Empty `src/` and `public/` directories.
    pub fn empty_sources(self) -> Self {
        self.dir("src").dir("public")
    }

    pub fn build(self) -> TempProject {
        let dir = tempfile::tempdir().expect("create temp project");
        for rel in self.dirs {
            fs::create_dir_all(dir.path().join(rel)).expect("create fixture dir");
        }
        for (rel, contents) in self.files {
            let path = dir.path().join(&rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create parent dirs");
            }
            fs::write(&path, contents).expect("write fixture file");
        }
        TempProject { dir }
    }
}

impl Default for ProjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A temporary project; removed on drop.
pub struct TempProject {
    dir: TempDir,
}

impl TempProject {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(path, contents).expect("write file");
    }

    /// Every regular file under `rel`, as sorted paths relative to `rel`.
    pub fn files_under(&self, rel: &str) -> Vec<String> {
        let base = self.path(rel);
        let mut out = Vec::new();
        collect(&base, &base, &mut out);
        out.sort();
        out
    }

    pub fn context(&self, policy: ParallelPolicy) -> TaskContext {
        TaskContext::new(self.root(), Arc::new(RealFileSystem), policy)
    }

    /// Registry declared from `config` with the built-in transforms.
    pub fn pipeline(&self, config: &Config) -> PipelineRegistry {
        let transforms =
            TransformRegistry::with_builtins(config, self.root()).expect("register transforms");
        PipelineRegistry::from_config(config, &transforms, self.root()).expect("declare pipeline")
    }
}

fn collect(base: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(base, &path, out);
        } else if let Ok(rel) = path.strip_prefix(base) {
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
}

/// Builder for `Config` to simplify test setup.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn data(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.config.data.insert(key.to_string(), value.into());
        self
    }

    pub fn policy(mut self, policy: ParallelPolicy) -> Self {
        self.config.build.parallel_policy = policy;
        self
    }

    pub fn compiler(mut self, capability: &str, cmd: &str) -> Self {
        self.config
            .compilers
            .insert(capability.to_string(), cmd.to_string());
        self
    }

    pub fn paths(mut self, paths: PathsSection) -> Self {
        self.config.paths = paths;
        self
    }

    pub fn build(self) -> Config {
        pageflow::config::validate_config(&self.config).expect("valid config from builder");
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
