// src/pipeline/registry.rs

//! Named top-level tasks, declared once at startup from [`Config`].
//!
//! ```text
//! build   = series(clean, parallel(series(compile, useref), image, font, extra))
//! compile = parallel(page, style, script)
//! develop = series(compile, serve)
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

use crate::config::Config;
use crate::errors::{PageflowError, Result};
use crate::exec::WatchAction;
use crate::fileset::SourceSpec;
use crate::server::ServerOptions;
use crate::task::{parallel, series, CleanTask, LeafTask, ServeTask, TaskRef, UserefTask};
use crate::transform::{DropMatching, SetExtension, TransformRef, TransformRegistry, When};
use crate::watch::{WatchBinding, WatchOptions};

/// Task names accepted on the command line.
pub const COMMANDS: &[&str] = &["clean", "build", "develop"];

#[derive(Debug, Clone)]
pub struct PipelineRegistry {
    tasks: BTreeMap<String, TaskRef>,
}

impl PipelineRegistry {
    pub fn from_config(config: &Config, transforms: &TransformRegistry, root: &Path) -> Result<Self> {
        let p = &config.paths;
        let mut reg = Self {
            tasks: BTreeMap::new(),
        };

        let clean: TaskRef = Arc::new(CleanTask::new(
            "clean",
            vec![p.temp.clone(), p.dist.clone()],
        ));

        let style_patterns = [format!("{}/assets/styles/*.scss", p.src)];
        let script_patterns = [format!("{}/assets/scripts/*.js", p.src)];
        let page_patterns = [format!("{}/*.html", p.src)];

        let style: TaskRef = Arc::new(
            LeafTask::builder("style")
                .source(SourceSpec::new(style_patterns.clone(), p.src.as_str())?)
                .transform(Arc::new(DropMatching::new(regex("^_")?)))
                .transform(transforms.require("sass")?)
                .transform(Arc::new(SetExtension::new("scss", "css")))
                .dest(p.temp.as_str())
                .build()?,
        );
        let script: TaskRef = Arc::new(
            LeafTask::builder("script")
                .source(SourceSpec::new(script_patterns.clone(), p.src.as_str())?)
                .transform(transforms.require("babel")?)
                .dest(p.temp.as_str())
                .build()?,
        );
        let page: TaskRef = Arc::new(
            LeafTask::builder("page")
                .source(SourceSpec::new(page_patterns.clone(), p.src.as_str())?)
                .transform(transforms.require("swig")?)
                .dest(p.temp.as_str())
                .build()?,
        );
        let compile = parallel(
            "compile",
            vec![Arc::clone(&page), Arc::clone(&style), Arc::clone(&script)],
        );

        let useref: TaskRef = Arc::new(UserefTask::new(
            "useref",
            SourceSpec::new([format!("{}/*.html", p.temp)], p.temp.as_str())?,
            vec![p.temp.clone(), ".".to_string()],
            vec![
                when(r"\.js$", transforms.require("uglify")?)?,
                when(r"\.css$", transforms.require("clean-css")?)?,
                when(r"\.html$", transforms.require("htmlmin")?)?,
            ],
            p.dist.as_str(),
        )?);

        let images = format!("{}/assets/images/**", p.src);
        let fonts = format!("{}/assets/fonts/**", p.src);
        let public = format!("{}/**", p.public);

        let image: TaskRef = Arc::new(
            LeafTask::builder("image")
                .source(SourceSpec::new([images.clone()], p.src.as_str())?)
                .transform(transforms.require("imagemin")?)
                .dest(p.dist.as_str())
                .build()?,
        );
        let font: TaskRef = Arc::new(
            LeafTask::builder("font")
                .source(SourceSpec::new([fonts.clone()], p.src.as_str())?)
                .transform(transforms.require("imagemin")?)
                .dest(p.dist.as_str())
                .build()?,
        );
        let extra: TaskRef = Arc::new(
            LeafTask::builder("extra")
                .source(SourceSpec::new([public.clone()], p.public.as_str())?)
                .dest(p.dist.as_str())
                .build()?,
        );

        let build = series(
            "build",
            vec![
                Arc::clone(&clean),
                parallel(
                    "build:assets",
                    vec![
                        series("build:bundle", vec![Arc::clone(&compile), Arc::clone(&useref)]),
                        Arc::clone(&image),
                        Arc::clone(&font),
                        Arc::clone(&extra),
                    ],
                ),
            ],
        );

        let bindings = vec![
            (
                WatchBinding::new("style", style_patterns)?,
                WatchAction::RunTask(Arc::clone(&style)),
            ),
            (
                WatchBinding::new("script", script_patterns)?,
                WatchAction::RunTask(Arc::clone(&script)),
            ),
            (
                WatchBinding::new("page", page_patterns)?,
                WatchAction::RunTask(Arc::clone(&page)),
            ),
            (
                WatchBinding::new("assets", [images, fonts, public])?,
                WatchAction::Reload,
            ),
        ];
        let serve: TaskRef = Arc::new(ServeTask::new(
            "serve",
            ServerOptions {
                host: config.server.host.clone(),
                port: config.server.port,
                root: root.to_path_buf(),
                roots: vec![p.temp.clone(), p.src.clone(), p.public.clone()],
                routes: config.server.routes.clone(),
            },
            WatchOptions {
                debounce: Duration::from_millis(config.watch.debounce_ms),
                use_hash: config.watch.use_hash,
            },
            bindings,
        ));
        let develop = series("develop", vec![Arc::clone(&compile), Arc::clone(&serve)]);

        for task in [
            clean, style, script, page, compile, useref, image, font, extra, build, serve, develop,
        ] {
            reg.insert(task);
        }
        debug!(tasks = ?reg.names(), "pipeline declared");
        Ok(reg)
    }

    fn insert(&mut self, task: TaskRef) {
        self.tasks.insert(task.name().to_string(), task);
    }

    pub fn get(&self, name: &str) -> Result<TaskRef> {
        self.tasks
            .get(name)
            .cloned()
            .ok_or_else(|| PageflowError::TaskNotFound(name.to_string()))
    }

    /// Declared task names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }
}

fn regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| PageflowError::ConfigError(format!("invalid regex {pattern:?}: {e}")))
}

fn when(pattern: &str, inner: TransformRef) -> Result<TransformRef> {
    Ok(Arc::new(When::new(regex(pattern)?, inner)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::render_tree;

    fn registry() -> PipelineRegistry {
        let config = Config::default();
        let transforms = TransformRegistry::with_builtins(&config, Path::new("/p")).unwrap();
        PipelineRegistry::from_config(&config, &transforms, Path::new("/p")).unwrap()
    }

    #[test]
    fn declares_every_named_task() {
        let reg = registry();
        for name in [
            "clean", "style", "script", "page", "compile", "useref", "image", "font", "extra",
            "build", "serve", "develop",
        ] {
            assert_eq!(reg.get(name).unwrap().name(), name);
        }
        for name in COMMANDS {
            assert!(reg.get(name).is_ok());
        }
        assert!(matches!(reg.get("deploy"), Err(PageflowError::TaskNotFound(_))));
    }

    #[test]
    fn build_graph_shape() {
        let tree = render_tree(&registry().get("build").unwrap());
        let names: Vec<&str> = tree
            .lines()
            .map(|l| l.trim_start().split(':').next().unwrap_or(""))
            .collect();
        assert_eq!(names[0], "build");
        assert_eq!(names[1], "clean");
        assert!(tree.contains("build: series(clean, build:assets)"));
        assert!(tree.contains("parallel(build:bundle, image, font, extra)"));
        assert!(tree.contains("compile: parallel(page, style, script)"));
        assert!(tree.contains("useref: temp/*.html -> useref(search: temp, .)"));
    }

    #[test]
    fn develop_compiles_then_serves() {
        let develop = registry().get("develop").unwrap();
        let children: Vec<&str> = develop.children().iter().map(|c| c.name()).collect();
        assert_eq!(children, vec!["compile", "serve"]);
    }
}
