// ABOUTME: Batch processing for the saladplate CLI
// ABOUTME: Reads, templates, and writes each input file while isolating per-file failures

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info};

use crate::output::OutputCoordinator;
use crate::template::host::read_lossy;
use crate::template::{SourceLocation, TemplateEngine};

/// Outcome of templating a batch of input files
#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: usize,
    pub failures: Vec<(SourceLocation, anyhow::Error)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total(&self) -> usize {
        self.processed + self.failures.len()
    }
}

/// Template every source and write the results in input order.
///
/// Up to `max_concurrent` documents are templated at once. A failure in one
/// document is logged and recorded; the rest of the batch still runs.
pub async fn process_files(
    sources: Vec<SourceLocation>,
    engine: &TemplateEngine,
    coordinator: &OutputCoordinator,
    max_concurrent: usize,
) -> BatchReport {
    let mut report = BatchReport::default();

    let results = stream::iter(sources)
        .map(|source| async move {
            let rendered = render_source(&source, engine).await;
            (source, rendered)
        })
        .buffered(max_concurrent.max(1));
    futures::pin_mut!(results);

    while let Some((source, rendered)) = results.next().await {
        let outcome = match rendered {
            Ok(text) => write_output(&source, &text, coordinator).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => report.processed += 1,
            Err(e) => {
                error!("{}: {:#}", source, e);
                report.failures.push((source, e));
            }
        }
    }

    info!(
        "Templated {} of {} files",
        report.processed,
        report.total()
    );
    report
}

async fn render_source(source: &SourceLocation, engine: &TemplateEngine) -> Result<String> {
    debug!("reading {}...", source);
    let content = read_source(source).await?;

    debug!("templating {}...", source);
    let text = engine
        .template(&content, source)
        .await
        .with_context(|| format!("Failed to template {}", source))?;
    Ok(text)
}

async fn read_source(source: &SourceLocation) -> Result<String> {
    match source {
        SourceLocation::Stdin => {
            let mut bytes = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut bytes)
                .await
                .context("Failed to read standard input")?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        SourceLocation::Path(path) => read_lossy(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
    }
}

async fn write_output(
    source: &SourceLocation,
    text: &str,
    coordinator: &OutputCoordinator,
) -> Result<()> {
    debug!("writing {}...", coordinator.describe_destination(source));
    coordinator
        .write(source, text)
        .await
        .with_context(|| format!("Failed to write output for {}", source))
}
