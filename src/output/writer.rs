// ABOUTME: Output writers for the shared sinks (stdout and a combined file) and per-document files
// ABOUTME: Shared writers serialize whole documents behind an async mutex

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use super::error::{OutputError, Result};

#[async_trait]
pub trait OutputWriter: Send + Sync {
    /// Write one complete document.
    async fn write(&self, content: &str) -> Result<()>;

    async fn flush(&self) -> Result<()>;

    fn describe(&self) -> String;
}

pub struct StdoutWriter {
    stdout: Mutex<tokio::io::Stdout>,
}

pub struct FileWriter {
    path: PathBuf,
    file: Mutex<fs::File>,
}

impl Default for StdoutWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl StdoutWriter {
    pub fn new() -> Self {
        Self {
            stdout: Mutex::new(tokio::io::stdout()),
        }
    }
}

#[async_trait]
impl OutputWriter for StdoutWriter {
    async fn write(&self, content: &str) -> Result<()> {
        let mut stdout = self.stdout.lock().await;
        stdout
            .write_all(content.as_bytes())
            .await
            .map_err(|e| OutputError::WriteError {
                destination: self.describe(),
                source: e,
            })?;

        debug!("Output written to stdout ({} bytes)", content.len());
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.stdout.lock().await.flush().await?;
        Ok(())
    }

    fn describe(&self) -> String {
        "<stdout>".to_string()
    }
}

impl FileWriter {
    /// Create (or truncate) the file that receives every document
    pub async fn create(path: &Path) -> Result<Self> {
        create_parent_dirs(path).await?;

        let file = fs::File::create(path)
            .await
            .map_err(|e| OutputError::OpenError {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }
}

#[async_trait]
impl OutputWriter for FileWriter {
    async fn write(&self, content: &str) -> Result<()> {
        let mut file = self.file.lock().await;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| OutputError::WriteError {
                destination: self.describe(),
                source: e,
            })?;

        debug!(
            "Output appended to file: {} ({} bytes)",
            self.path.display(),
            content.len()
        );
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.file.lock().await.flush().await?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Write a standalone document file, creating parent directories as needed.
pub async fn write_document(path: &Path, content: &str) -> Result<()> {
    create_parent_dirs(path).await?;

    fs::write(path, content)
        .await
        .map_err(|e| OutputError::WriteError {
            destination: path.display().to_string(),
            source: e,
        })?;

    debug!(
        "Output written to file: {} ({} bytes)",
        path.display(),
        content.len()
    );
    Ok(())
}

async fn create_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| OutputError::CreateDirError {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
    }
    Ok(())
}
