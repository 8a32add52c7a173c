//! Document ingestion boundary: validates files before the engine sees them.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use lethe_core::{EmbeddingProvider, GenerationProvider};
use lethe_engine::{ItemId, PolicyEngine};
use tracing::{info, warn};

pub const ACCEPTED_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// Outcome for one file of a batch.
#[derive(Debug)]
pub struct IngestReport {
    pub path: PathBuf,
    pub result: Result<ItemId, String>,
}

/// Read a document for ingestion. Returns `(content, source_name)`.
pub fn read_document(path: &Path) -> anyhow::Result<(String, String)> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
        bail!(
            "unsupported file type '{}'; expected one of: {}",
            path.display(),
            ACCEPTED_EXTENSIONS.join(", ")
        );
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    if content.trim().is_empty() {
        bail!("{} is empty", path.display());
    }

    let source_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map_or_else(|| path.display().to_string(), ToOwned::to_owned);
    Ok((content, source_name))
}

/// Ingest every file independently; one failure does not stop the batch.
pub async fn ingest_files<G, E>(engine: &PolicyEngine<G, E>, paths: &[PathBuf]) -> Vec<IngestReport>
where
    G: GenerationProvider + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    let mut reports = Vec::with_capacity(paths.len());
    for path in paths {
        let result = match read_document(path) {
            Ok((content, source_name)) => engine
                .ingest(&content, &source_name)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(format!("{e:#}")),
        };
        match &result {
            Ok(id) => info!("Forgot {} as item {}", path.display(), id),
            Err(reason) => warn!("Skipped {}: {}", path.display(), reason),
        }
        reports.push(IngestReport {
            path: path.clone(),
            result,
        });
    }
    reports
}

/// Print one line per report.
pub fn print_reports(reports: &[IngestReport]) {
    for report in reports {
        match &report.result {
            Ok(id) => println!("Forgot {} (item {id})", report.path.display()),
            Err(reason) => eprintln!("Failed {}: {reason}", report.path.display()),
        }
    }
}
