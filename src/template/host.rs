// ABOUTME: Host environment boundary used by the template engine
// ABOUTME: Environment lookups, file reads, and shell command execution behind an async trait

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::debug;

use super::error::{Result, TemplateError};

/// Everything the engine needs from the outside world.
#[async_trait]
pub trait Host: Send + Sync {
    /// Look up an environment variable by exact name.
    fn var(&self, name: &str) -> Option<String>;

    /// Read a file's full text; invalid UTF-8 is replaced, not rejected.
    async fn read_file(&self, path: &Path) -> std::io::Result<String>;

    /// Run a shell command line in `cwd` and return its captured stdout.
    async fn execute(&self, command: &str, cwd: &Path) -> Result<String>;

    /// Identity used for include cycle detection.
    async fn canonicalize(&self, path: &Path) -> PathBuf {
        path.to_path_buf()
    }
}

/// Host backed by the real process environment, filesystem, and shell.
#[derive(Debug, Clone)]
pub struct SystemHost {
    shell: String,
}

#[cfg(unix)]
fn default_shell() -> String {
    "sh".to_string()
}

#[cfg(windows)]
fn default_shell() -> String {
    "cmd".to_string()
}

impl Default for SystemHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemHost {
    pub fn new() -> Self {
        Self {
            shell: default_shell(),
        }
    }

    /// Use a different shell interpreter for commands
    pub fn with_shell<S: Into<String>>(mut self, shell: S) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    fn build_command(&self, command: &str, cwd: &Path) -> Command {
        let mut cmd = Command::new(&self.shell);
        if cfg!(windows) {
            cmd.arg("/C");
        } else {
            cmd.arg("-c");
        }
        cmd.arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

#[async_trait]
impl Host for SystemHost {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    async fn read_file(&self, path: &Path) -> std::io::Result<String> {
        read_lossy(path).await
    }

    async fn execute(&self, command: &str, cwd: &Path) -> Result<String> {
        let output = self
            .build_command(command, cwd)
            .output()
            .await
            .map_err(|source| TemplateError::SpawnError {
                command: command.to_string(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            return Err(TemplateError::CommandFailed {
                command: command.to_string(),
                status: describe_status(&output.status),
                stderr,
            });
        }

        if !stderr.is_empty() {
            debug!("Command '{}' wrote to stderr: {}", command, stderr.trim_end());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn canonicalize(&self, path: &Path) -> PathBuf {
        tokio::fs::canonicalize(path)
            .await
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Read a file and decode it as UTF-8, replacing invalid sequences.
pub async fn read_lossy(path: &Path) -> std::io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn describe_status(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit code {}", code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("signal {}", signal);
        }
    }

    "unknown status".to_string()
}
