// src/transform/builtin/template.rs

//! Built-in `swig` page templating on `minijinja`.
//!
//! Pages are rendered with the `data` table from configuration as context.
//! `{% include %}` / `{% extends %}` / `{% import %}` load templates from
//! the source root, read fresh on every render so watch rebuilds pick up
//! edited partials. Output is HTML-escaped unless `safe` is applied, and
//! undefined values (including attributes of undefined values) render
//! empty.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use minijinja::{AutoEscape, Environment, UndefinedBehavior, Value};

use crate::transform::{has_extension, AssetFile, Transform, TransformFuture};

#[derive(Debug)]
pub struct Template {
    data: toml::Table,
    template_root: PathBuf,
}

impl Template {
    pub fn new(data: toml::Table, template_root: impl Into<PathBuf>) -> Self {
        Self {
            data,
            template_root: template_root.into(),
        }
    }

    fn environment(&self) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(&self.template_root));
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env
    }

    /// Render `source` as the page `name`.
    pub fn render(&self, name: &str, source: &str) -> Result<String> {
        let ctx = Value::from_serialize(&self.data);
        self.environment()
            .render_named_str(name, source, ctx)
            .with_context(|| format!("rendering template {name}"))
    }
}

impl Transform for Template {
    fn name(&self) -> &str {
        "swig"
    }

    fn apply<'a>(&'a self, mut file: AssetFile) -> TransformFuture<'a> {
        Box::pin(async move {
            if !has_extension(&file.relative, &["html", "htm"]) {
                return Ok(Some(file));
            }
            let source = String::from_utf8(std::mem::take(&mut file.contents))
                .map_err(|_| anyhow!("template is not valid UTF-8"))?;
            file.contents = self.render(&file.relative_str(), &source)?.into_bytes();
            Ok(Some(file))
        })
    }
}
