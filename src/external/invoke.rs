//! Subprocess invocation with independent wall-clock timeouts, and the
//! per-run temporary directory guard.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Captured output of one tool invocation
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs one external tool. stdout/stderr are captured separately; the
/// timeout forcibly terminates the subprocess and surfaces a scoped tool
/// failure, never a whole-run failure.
pub async fn invoke(
    tool: &str,
    program: &Path,
    args: &[&str],
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<ToolOutput> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    debug!("invoking {} {:?}", program.display(), args);
    let child = cmd
        .spawn()
        .map_err(|e| Error::tool_failed(tool, format!("failed to spawn: {}", e)))?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        // Dropping the future kills the child (kill_on_drop)
        Err(_) => {
            return Err(Error::tool_failed(
                tool,
                format!("timed out after {:?}", timeout),
            ))
        }
        Ok(Err(e)) => return Err(Error::tool_failed(tool, e.to_string())),
        Ok(Ok(output)) => output,
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(Error::tool_failed(
            tool,
            format!(
                "exit status {}: {}",
                output.status,
                stderr.lines().next().unwrap_or("")
            ),
        ));
    }
    Ok(ToolOutput { stdout, stderr })
}

/// Per-run temporary directory for extracted attachments, removed on
/// every exit path through Drop.
#[derive(Debug)]
pub struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    pub fn new(root: Option<&Path>) -> std::io::Result<Self> {
        let base = root
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);
        let path = base.join(format!("pdfsleuth-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Files currently inside the directory, sorted for determinism
    pub fn entries(&self) -> Vec<PathBuf> {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(&self.path)
            .map(|iter| iter.filter_map(|e| e.ok().map(|e| e.path())).collect())
            .unwrap_or_default();
        entries.sort();
        entries
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}
