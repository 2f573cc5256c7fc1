// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher and resolver.

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First try a direct `strip_prefix(root)`.
/// - If that fails (symlinks, `/private/var` vs `/var` on macOS), canonicalize
///   both paths and try again.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(slashed(rel));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(slashed(rel));
        }
    }

    None
}

/// URL path under which a file written at `rel` (relative to a served root)
/// is reachable: `assets/styles/main.css` -> `/assets/styles/main.css`.
pub fn url_path(rel: &Path) -> String {
    format!("/{}", slashed(rel).trim_start_matches('/'))
}

fn slashed(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_to_root() {
        assert_eq!(
            relative_str(Path::new("/p"), Path::new("/p/src/assets/scripts/app.js")).as_deref(),
            Some("src/assets/scripts/app.js")
        );
        assert_eq!(relative_str(Path::new("/p"), Path::new("/elsewhere/x")), None);
    }

    #[test]
    fn url_paths_are_rooted() {
        assert_eq!(url_path(Path::new("assets/styles/a.css")), "/assets/styles/a.css");
        assert_eq!(url_path(Path::new("index.html")), "/index.html");
    }
}
