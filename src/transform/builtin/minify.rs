// src/transform/builtin/minify.rs

//! Built-in minifiers for the `useref` output stage.
//!
//! Scripts go through `oxc_minifier`, stylesheets through `lightningcss`.
//! HTML only loses comments and formatting whitespace; inline `<style>`
//! and `<script>` bodies are minified with the same engines.

use anyhow::{anyhow, bail, Result};
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;
use regex::Regex;

use crate::transform::{AssetFile, Transform, TransformFuture};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinifyKind {
    /// `uglify`
    Js,
    /// `clean-css`
    Css,
    /// `htmlmin`
    Html,
}

#[derive(Debug)]
pub struct Minify {
    kind: MinifyKind,
    html: Option<HtmlPatterns>,
}

#[derive(Debug)]
struct HtmlPatterns {
    raw_blocks: Regex,
    comment: Regex,
    tag_gap: Regex,
    whitespace: Regex,
}

impl HtmlPatterns {
    fn new() -> Result<Self> {
        Ok(Self {
            raw_blocks: Regex::new(
                r"(?is)<pre\b.*?</pre\s*>|<textarea\b.*?</textarea\s*>|<script\b.*?</script\s*>|<style\b.*?</style\s*>",
            )?,
            comment: Regex::new(r"(?s)<!--.*?-->")?,
            tag_gap: Regex::new(r">\s*\n\s*<")?,
            whitespace: Regex::new(r"\s+")?,
        })
    }
}

impl Minify {
    pub fn new(kind: MinifyKind) -> Result<Self> {
        let html = match kind {
            MinifyKind::Html => Some(HtmlPatterns::new()?),
            MinifyKind::Js | MinifyKind::Css => None,
        };
        Ok(Self { kind, html })
    }
}

impl Transform for Minify {
    fn name(&self) -> &str {
        match self.kind {
            MinifyKind::Js => "uglify",
            MinifyKind::Css => "clean-css",
            MinifyKind::Html => "htmlmin",
        }
    }

    fn apply<'a>(&'a self, mut file: AssetFile) -> TransformFuture<'a> {
        Box::pin(async move {
            let text = String::from_utf8(file.contents)
                .map_err(|_| anyhow!("{} input is not valid UTF-8", self.name()))?;
            let out = match (self.kind, &self.html) {
                (MinifyKind::Js, _) => minify_js(&text)?,
                (MinifyKind::Css, _) => minify_css(&text)?,
                (MinifyKind::Html, Some(patterns)) => minify_html(&text, patterns),
                (MinifyKind::Html, None) => text,
            };
            file.contents = out.into_bytes();
            Ok(Some(file))
        })
    }
}

/// Compress and mangle a classic (non-module) script with `oxc_minifier`.
pub fn minify_js(src: &str) -> Result<String> {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, src, SourceType::cjs()).parse();
    if parsed.panicked || !parsed.errors.is_empty() {
        let messages: Vec<String> = parsed.errors.iter().map(|e| e.to_string()).collect();
        bail!("failed to parse script: {}", messages.join("; "));
    }

    let mut program = parsed.program;
    let minified = Minifier::new(MinifierOptions::default()).minify(&allocator, &mut program);
    let out = Codegen::new()
        .with_options(CodegenOptions::minify())
        .with_scoping(minified.scoping)
        .build(&program);
    Ok(out.code)
}

/// Parse, minify and print a stylesheet with `lightningcss`.
pub fn minify_css(src: &str) -> Result<String> {
    let mut stylesheet = StyleSheet::parse(src, ParserOptions::default())
        .map_err(|e| anyhow!("failed to parse stylesheet: {e}"))?;
    stylesheet
        .minify(MinifyOptions::default())
        .map_err(|e| anyhow!("failed to minify stylesheet: {e}"))?;
    let printed = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("failed to print stylesheet: {e}"))?;
    Ok(printed.code)
}

const RAW_MARK: &str = "pageflow-raw-";

fn minify_html(src: &str, patterns: &HtmlPatterns) -> String {
    // Raw blocks are swapped for tag-like placeholders so whitespace
    // collapsing treats them as ordinary elements.
    let mut blocks = Vec::new();
    let masked = patterns
        .raw_blocks
        .replace_all(src, |caps: &regex::Captures<'_>| {
            blocks.push(minify_raw_block(&caps[0]));
            format!("<{RAW_MARK}{}>", blocks.len() - 1)
        })
        .into_owned();

    let mut out = collapse_markup(&masked, patterns);
    for (i, block) in blocks.iter().enumerate() {
        out = out.replacen(&format!("<{RAW_MARK}{i}>"), block, 1);
    }
    out.trim().to_string()
}

fn collapse_markup(text: &str, patterns: &HtmlPatterns) -> String {
    let without_comments = patterns.comment.replace_all(text, |caps: &regex::Captures<'_>| {
        let comment = &caps[0];
        // Conditional comments carry markup for old browsers.
        if comment.starts_with("<!--[if") {
            comment.to_string()
        } else {
            String::new()
        }
    });
    let gaps = patterns.tag_gap.replace_all(&without_comments, "><");
    patterns.whitespace.replace_all(&gaps, " ").into_owned()
}

fn minify_raw_block(block: &str) -> String {
    let lower = block.to_ascii_lowercase();
    let (Some(open_end), Some(close_start)) = (block.find('>'), lower.rfind("</")) else {
        return block.to_string();
    };
    if open_end >= close_start {
        return block.to_string();
    }
    let open = &block[..=open_end];
    let body = &block[open_end + 1..close_start];
    let close = &block[close_start..];

    let open_lower = open.to_ascii_lowercase();
    let minified = if lower.starts_with("<style") {
        minify_css(body).ok()
    } else if lower.starts_with("<script") && is_classic_script(&open_lower) {
        minify_js(body).ok()
    } else {
        None
    };
    // Bodies the engines cannot parse are kept as written.
    let body = minified.unwrap_or_else(|| body.to_string());
    format!("{open}{body}{close}")
}

/// Inline script without `src` whose type is JavaScript (JSON and template
/// blocks are left alone).
fn is_classic_script(open_lower: &str) -> bool {
    if open_lower.contains("src=") {
        return false;
    }
    match open_lower.find("type=") {
        None => true,
        Some(idx) => {
            let value = open_lower[idx + 5..].trim_start_matches(['"', '\'']);
            value.starts_with("text/javascript") || value.starts_with("application/javascript")
        }
    }
}
