// src/transform/builtin/mod.rs

//! Built-in implementations of the named capabilities.

pub mod minify;
pub mod sass;
pub mod template;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::transform::{AssetFile, Transform, TransformFuture, TransformRef};

pub use minify::{Minify, MinifyKind};
pub use sass::Sass;
pub use template::Template;

/// Every capability name a pipeline may refer to.
pub const CAPABILITIES: &[&str] = &[
    "sass",
    "babel",
    "swig",
    "imagemin",
    "uglify",
    "clean-css",
    "htmlmin",
];

/// Identity transform under a capability name.
///
/// Used for `imagemin` (images are copied as-is) and as the base of `babel`.
#[derive(Debug)]
pub struct Passthrough {
    name: String,
}

impl Passthrough {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Transform for Passthrough {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply<'a>(&'a self, file: AssetFile) -> TransformFuture<'a> {
        Box::pin(async move { Ok(Some(file)) })
    }
}

/// Built-in `babel`: scripts are already written for the target browsers,
/// so only line endings are normalized.
#[derive(Debug, Default)]
pub struct Babel;

impl Transform for Babel {
    fn name(&self) -> &str {
        "babel"
    }

    fn apply<'a>(&'a self, mut file: AssetFile) -> TransformFuture<'a> {
        Box::pin(async move {
            if file.contents.contains(&b'\r') {
                let text = String::from_utf8_lossy(&file.contents).replace("\r\n", "\n");
                file.contents = text.into_bytes();
            }
            Ok(Some(file))
        })
    }
}

/// Instantiate the built-in transform for `capability` in the project at
/// `root`. Stylesheet imports and template includes resolve under the
/// configured source directory.
///
/// Returns `Ok(None)` for an unknown name.
pub fn builtin(capability: &str, config: &Config, root: &Path) -> Result<Option<TransformRef>> {
    let source_root = root.join(&config.paths.src);
    let transform: TransformRef = match capability {
        "sass" => Arc::new(Sass::new(source_root)),
        "babel" => Arc::new(Babel),
        "swig" => Arc::new(Template::new(config.data.clone(), source_root)),
        "imagemin" => Arc::new(Passthrough::new("imagemin")),
        "uglify" => Arc::new(Minify::new(MinifyKind::Js)?),
        "clean-css" => Arc::new(Minify::new(MinifyKind::Css)?),
        "htmlmin" => Arc::new(Minify::new(MinifyKind::Html)?),
        _ => return Ok(None),
    };
    Ok(Some(transform))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_capability_has_a_builtin() {
        let config = Config::default();
        let root = Path::new("/p");
        for name in CAPABILITIES {
            let t = builtin(name, &config, root).unwrap().unwrap();
            assert_eq!(t.name(), *name);
        }
        assert!(builtin("less", &config, root).unwrap().is_none());
    }

    #[tokio::test]
    async fn babel_normalizes_line_endings() {
        let out = Babel
            .apply(AssetFile::new("app.js", "a();\r\nb();\r\n"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out.contents, b"a();\nb();\n");
    }
}
