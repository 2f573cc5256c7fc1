// src/transform/useref.rs

//! HTML build blocks.
//!
//! ```html
//! <!-- build:css assets/styles/vendor.css -->
//! <link rel="stylesheet" href="/node_modules/bootstrap/dist/css/bootstrap.css">
//! <!-- endbuild -->
//! ```
//!
//! Each block is replaced by a single reference to its bundle path, and the
//! referenced files become the bundle's sources. `build:remove` blocks are
//! dropped from the page.

use anyhow::{bail, Result};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    Css,
    Js,
}

/// One bundle declared by a build block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub kind: BundleKind,
    /// Output path relative to the destination root.
    pub path: String,
    /// Referenced URLs, in document order, with query and fragment removed.
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub html: String,
    pub bundles: Vec<Bundle>,
}

#[derive(Debug)]
pub struct BuildBlocks {
    block: Regex,
    href: Regex,
    src: Regex,
}

impl BuildBlocks {
    pub fn new() -> Result<Self> {
        Ok(Self {
            block: Regex::new(
                r"(?s)<!--\s*build:(\w+)(?:\s+([^\s>]+?))?\s*-->(.*?)<!--\s*endbuild\s*-->",
            )?,
            href: Regex::new(r#"(?i)<link\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#)?,
            src: Regex::new(r#"(?i)<script\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#)?,
        })
    }

    /// Replace every build block in `html` and collect the bundles.
    pub fn rewrite(&self, html: &str) -> Result<Rewritten> {
        let mut out = String::with_capacity(html.len());
        let mut bundles = Vec::new();
        let mut last = 0;

        for caps in self.block.captures_iter(html) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_str(&html[last..whole.start()]);
            last = whole.end();

            let kind = &caps[1];
            let target = caps.get(2).map(|m| m.as_str());
            let body = &caps[3];
            if kind == "remove" {
                continue;
            }
            let Some(target) = target else {
                bail!("build:{kind} block without a bundle path");
            };
            if has_parent_segment(target) {
                bail!("bundle path '{target}' must stay inside the destination directory");
            }

            let (kind, refs, tag) = match kind {
                "css" => (
                    BundleKind::Css,
                    &self.href,
                    format!(r#"<link rel="stylesheet" href="{target}">"#),
                ),
                "js" => (
                    BundleKind::Js,
                    &self.src,
                    format!(r#"<script src="{target}"></script>"#),
                ),
                other => bail!("unknown build block type '{other}'"),
            };

            let sources = refs
                .captures_iter(body)
                .map(|c| strip_query(&c[1]).to_string())
                .collect();
            out.push_str(&tag);
            bundles.push(Bundle {
                kind,
                path: target.trim_start_matches('/').to_string(),
                sources,
            });
        }

        out.push_str(&html[last..]);
        if out.contains("<!-- build:") || out.contains("<!--build:") {
            bail!("build block without matching '<!-- endbuild -->'");
        }
        Ok(Rewritten { html: out, bundles })
    }
}

/// Whether `path` has a `..` segment (either separator).
pub fn has_parent_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| segment == "..")
}

fn strip_query(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}
