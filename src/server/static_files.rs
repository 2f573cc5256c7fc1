// src/server/static_files.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::fs::FileSystem;

pub const EVENTS_PATH: &str = "/__pageflow/events";
pub const RELOAD_SCRIPT_PATH: &str = "/__pageflow/reload.js";

/// Map a request path to a file.
///
/// Route aliases (longest prefix first) are checked before the roots; roots
/// are tried in order and the first match wins. A directory resolves to
/// its `index.html`. Segments are percent-decoded first; a path with a
/// `..` segment, or a segment that decodes to a separator or invalid
/// UTF-8, never resolves.
pub fn resolve_static(
    fs: &dyn FileSystem,
    project_root: &Path,
    roots: &[String],
    routes: &BTreeMap<String, String>,
    url_path: &str,
) -> Option<PathBuf> {
    let mut segments = Vec::new();
    for raw in url_path.split('/') {
        let segment = urlencoding::decode(raw).ok()?;
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." || segment.contains(['/', '\\', '\0']) {
            return None;
        }
        segments.push(segment);
    }
    let rel = segments.join("/");

    let mut aliases: Vec<(&String, &String)> = routes.iter().collect();
    aliases.sort_by_key(|(prefix, _)| std::cmp::Reverse(prefix.len()));
    for (prefix, dir) in aliases {
        let prefix = prefix.trim_matches('/');
        let rest = if rel == prefix {
            Some("")
        } else {
            rel.strip_prefix(prefix).and_then(|r| r.strip_prefix('/'))
        };
        if let Some(rest) = rest {
            if let Some(found) = lookup(fs, &project_root.join(dir), rest) {
                return Some(found);
            }
        }
    }

    roots
        .iter()
        .find_map(|root| lookup(fs, &project_root.join(root), &rel))
}

fn lookup(fs: &dyn FileSystem, dir: &Path, rel: &str) -> Option<PathBuf> {
    let candidate = if rel.is_empty() {
        dir.to_path_buf()
    } else {
        dir.join(rel)
    };
    if fs.is_file(&candidate) {
        return Some(candidate);
    }
    let index = candidate.join("index.html");
    (fs.is_dir(&candidate) && fs.is_file(&index)).then_some(index)
}

/// Content type from file extension.
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Add the reload client before `</body>`, or at the end when there is none.
pub fn inject_reload_script(html: &[u8]) -> Vec<u8> {
    let html = String::from_utf8_lossy(html);
    let tag = format!(r#"<script src="{RELOAD_SCRIPT_PATH}"></script>"#);

    let mut out = String::with_capacity(html.len() + tag.len() + 2);
    match html.rfind("</body>") {
        Some(pos) => {
            out.push_str(&html[..pos]);
            out.push_str(&tag);
            out.push('\n');
            out.push_str(&html[pos..]);
        }
        None => {
            out.push_str(&html);
            out.push('\n');
            out.push_str(&tag);
        }
    }
    out.into_bytes()
}
