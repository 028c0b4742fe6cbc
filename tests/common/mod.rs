// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides temporary document trees and a scriptable in-memory host

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::fs;

use saladplate::template::{Host, Result, TemplateError};

pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `content` at `relative`, creating parent directories.
    pub async fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .expect("Failed to create parent directory");
        }
        fs::write(&path, content)
            .await
            .expect("Failed to write test document");
        path
    }

    pub async fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path().join(relative))
            .await
            .expect("Failed to read output")
    }
}

/// A scripted command answer: output after an optional delay.
#[derive(Clone)]
pub struct Scripted {
    pub output: String,
    pub delay: Duration,
}

/// In-memory host that can delay commands and counts concurrent executions.
#[derive(Default)]
pub struct ScriptedHost {
    vars: HashMap<String, String>,
    files: HashMap<PathBuf, String>,
    commands: HashMap<String, Scripted>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(PathBuf::from(path), content.to_string());
        self
    }

    pub fn with_command(mut self, command: &str, output: &str, delay_ms: u64) -> Self {
        self.commands.insert(
            command.to_string(),
            Scripted {
                output: output.to_string(),
                delay: Duration::from_millis(delay_ms),
            },
        );
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl Host for ScriptedHost {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    async fn read_file(&self, path: &Path) -> std::io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"))
    }

    async fn execute(&self, command: &str, _cwd: &Path) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let scripted = self.commands.get(command).cloned();
        if let Some(ref scripted) = scripted {
            tokio::time::sleep(scripted.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match scripted {
            Some(scripted) => Ok(scripted.output.replace("{call}", &call.to_string())),
            None => Err(TemplateError::CommandFailed {
                command: command.to_string(),
                status: "exit code 127".to_string(),
                stderr: format!("{}: not found", command),
            }),
        }
    }
}
