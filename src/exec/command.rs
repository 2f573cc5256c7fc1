// src/exec/command.rs

//! External compiler processes.

use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Environment variable carrying the relative path of the file being
/// compiled, for commands that need to know the input's name.
pub const FILE_ENV: &str = "PAGEFLOW_FILE";

/// Run `cmd` through the platform shell in `cwd`, feed `input` on stdin and
/// return everything the process wrote to stdout.
///
/// A non-zero exit status is an error carrying the process's stderr.
pub async fn run_filter(cmd: &str, cwd: &Path, file: &str, input: &[u8]) -> Result<Vec<u8>> {
    debug!(cmd = %cmd, file = %file, "starting compiler process");

    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    command
        .current_dir(cwd)
        .env(FILE_ENV, file)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning compiler process '{cmd}'"))?;

    // Feed stdin concurrently so a process that writes before it has read
    // everything cannot deadlock on a full pipe.
    let writer = child.stdin.take().map(|mut stdin| {
        let input = input.to_vec();
        tokio::spawn(async move {
            let res = stdin.write_all(&input).await;
            drop(stdin);
            res
        })
    });

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for compiler process '{cmd}'"))?;

    if let Some(writer) = writer {
        // A process may exit without reading its input; only a failed exit
        // status is an error.
        if let Ok(Err(e)) = writer.await {
            debug!(cmd = %cmd, error = %e, "compiler did not consume stdin");
        }
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stderr.lines() {
        debug!(cmd = %cmd, "stderr: {}", line);
    }

    let code = output.status.code().unwrap_or(-1);
    if !output.status.success() {
        bail!(
            "'{cmd}' exited with code {code}: {}",
            stderr.trim()
        );
    }

    info!(cmd = %cmd, file = %file, bytes = output.stdout.len(), "compiler process exited");
    Ok(output.stdout)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stdout_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_filter("tr a-z A-Z", dir.path(), "a.txt", b"hello").await.unwrap();
        assert_eq!(out, b"HELLO");
    }

    #[tokio::test]
    async fn file_name_is_exported() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_filter("printf %s \"$PAGEFLOW_FILE\"", dir.path(), "styles/a.scss", b"")
            .await
            .unwrap();
        assert_eq!(out, b"styles/a.scss");
    }

    #[tokio::test]
    async fn failure_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_filter("echo broken >&2; exit 3", dir.path(), "a", b"")
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("code 3"));
        assert!(err.contains("broken"));
    }
}
