// ABOUTME: Output coordination for templated documents
// ABOUTME: Owns the lazily opened shared sink and routes each document to its destination

pub mod config;
pub mod error;
pub mod writer;

use tokio::sync::OnceCell;
use tracing::debug;

use self::writer::{write_document, FileWriter, OutputWriter, StdoutWriter};
use crate::template::SourceLocation;

pub use self::config::{Destination, OutputTarget};
pub use self::error::{OutputError, Result};

/// Routes resolved documents to their destinations for one batch.
///
/// Stdout and combined-file targets share a single writer that is opened the
/// first time a document needs it and reused by every later document.
pub struct OutputCoordinator {
    target: OutputTarget,
    shared: OnceCell<Box<dyn OutputWriter>>,
}

impl OutputCoordinator {
    pub fn new(target: OutputTarget) -> Self {
        Self {
            target,
            shared: OnceCell::new(),
        }
    }

    pub fn target(&self) -> &OutputTarget {
        &self.target
    }

    /// Where the document read from `source` will be written
    pub fn describe_destination(&self, source: &SourceLocation) -> String {
        match self.target.destination_for(source) {
            Destination::Shared => self.target.describe(),
            Destination::File(path) => path.display().to_string(),
        }
    }

    /// Write one fully resolved document
    pub async fn write(&self, source: &SourceLocation, content: &str) -> Result<()> {
        match self.target.destination_for(source) {
            Destination::Shared => self.shared_writer().await?.write(content).await,
            Destination::File(path) => write_document(&path, content).await,
        }
    }

    /// Flush the shared writer, if one was ever opened, and release it
    pub async fn finish(self) -> Result<()> {
        if let Some(writer) = self.shared.get() {
            debug!("Flushing output {}", writer.describe());
            writer.flush().await?;
        }
        Ok(())
    }

    async fn shared_writer(&self) -> Result<&dyn OutputWriter> {
        let writer = self
            .shared
            .get_or_try_init(|| async {
                let writer: Box<dyn OutputWriter> = match &self.target {
                    OutputTarget::Combined(path) => Box::new(FileWriter::create(path).await?),
                    _ => Box::new(StdoutWriter::new()),
                };
                debug!("Opened shared output {}", writer.describe());
                Ok::<_, OutputError>(writer)
            })
            .await?;
        Ok(writer.as_ref())
    }
}

impl Default for OutputCoordinator {
    fn default() -> Self {
        Self::new(OutputTarget::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_combined_output_is_opened_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("all.txt");

        let coordinator = OutputCoordinator::new(OutputTarget::Combined(path.clone()));
        assert!(!path.exists());

        coordinator
            .write(&SourceLocation::from_arg("a.txt"), "a\n")
            .await
            .unwrap();
        coordinator
            .write(&SourceLocation::from_arg("b.txt"), "b\n")
            .await
            .unwrap();
        coordinator.finish().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[tokio::test]
    async fn test_directory_output_writes_each_document() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out");

        let coordinator = OutputCoordinator::new(OutputTarget::Directory {
            dir: out.clone(),
            suffix: Some(".conf".to_string()),
        });

        coordinator
            .write(&SourceLocation::from_arg("src/app.tpl"), "app\n")
            .await
            .unwrap();
        coordinator
            .write(&SourceLocation::Stdin, "piped\n")
            .await
            .unwrap();
        coordinator.finish().await.unwrap();

        assert_eq!(
            std::fs::read_to_string(out.join("app.conf")).unwrap(),
            "app\n"
        );
        assert_eq!(std::fs::read_to_string(out.join("stdin")).unwrap(), "piped\n");
    }

    #[test]
    fn test_describe_destination() {
        let coordinator = OutputCoordinator::new(OutputTarget::Directory {
            dir: PathBuf::from("out"),
            suffix: None,
        });
        assert_eq!(
            coordinator.describe_destination(&SourceLocation::from_arg("x/y.txt")),
            PathBuf::from("out/y.txt").display().to_string()
        );
        assert_eq!(
            OutputCoordinator::default().describe_destination(&SourceLocation::Stdin),
            "<stdout>"
        );
    }
}
