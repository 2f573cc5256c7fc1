// src/transform/external.rs

use std::path::PathBuf;

use crate::exec::command::run_filter;
use crate::transform::{AssetFile, Transform, TransformFuture};

/// A capability provided by a shell command from `[compilers]`.
///
/// The file's contents go to the command's stdin and its stdout becomes the
/// new contents. The command runs in the project root.
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    capability: String,
    command: String,
    cwd: PathBuf,
}

impl ExternalCommand {
    pub fn new(capability: impl Into<String>, command: impl Into<String>, cwd: PathBuf) -> Self {
        Self {
            capability: capability.into(),
            command: command.into(),
            cwd,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Transform for ExternalCommand {
    fn name(&self) -> &str {
        &self.capability
    }

    fn apply<'a>(&'a self, mut file: AssetFile) -> TransformFuture<'a> {
        Box::pin(async move {
            let rel = file.relative_str();
            file.contents = run_filter(&self.command, &self.cwd, &rel, &file.contents).await?;
            Ok(Some(file))
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn command_output_becomes_contents() {
        let dir = tempfile::tempdir().unwrap();
        let t = ExternalCommand::new("babel", "sed s/var/let/", dir.path().to_path_buf());
        let out = t
            .apply(AssetFile::new("assets/scripts/a.js", "var x = 1;\n"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out.contents, b"let x = 1;\n");
        assert_eq!(out.relative, PathBuf::from("assets/scripts/a.js"));
        assert_eq!(t.name(), "babel");
    }
}
