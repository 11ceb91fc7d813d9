//! Directory batch conversion.
//!
//! Discovers every `.pdf` in a directory (case-insensitive, sorted by file
//! name) and converts them one at a time. A document that fails is reported
//! in the summary and skipped; the run continues with the next file.

use crate::config::ConversionConfig;
use crate::convert;
use crate::error::PdfMillError;
use crate::model;
use crate::output::ConversionStats;
use crate::pipeline::write::markdown_path_for;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Outcome of one document in a batch run.
#[derive(Debug)]
pub struct DocumentOutcome {
    pub pdf_path: PathBuf,
    /// Where the markdown landed; `None` when the document failed.
    pub output_path: Option<PathBuf>,
    pub stats: Option<ConversionStats>,
    pub error: Option<PdfMillError>,
}

impl DocumentOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of a whole batch run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<DocumentOutcome>,
}

impl RunSummary {
    pub fn converted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.converted()
    }
}

/// Convert every PDF in `input_dir`, writing markdown next to each file or
/// into `output_dir` when given. Output names never overwrite existing
/// files (numeric suffixes are appended instead).
///
/// # Errors
/// Fails when `input_dir` itself cannot be read, or when no usable LLM
/// provider is configured; individual document failures are recorded in
/// the returned [`RunSummary`].
pub async fn convert_dir(
    input_dir: impl AsRef<Path>,
    output_dir: Option<&Path>,
    config: &ConversionConfig,
) -> Result<RunSummary, PdfMillError> {
    let input_dir = input_dir.as_ref();
    let output_dir = output_dir.unwrap_or(input_dir);

    // A missing API key or unknown provider is a run-level configuration
    // error: abort before any document is opened rather than failing every
    // PDF in turn.
    model::resolve_models(config)?;

    let pdfs = discover_pdfs(input_dir)?;
    if pdfs.is_empty() {
        warn!("No PDF files found in {}", input_dir.display());
        return Ok(RunSummary::default());
    }
    info!("Found {} PDF(s) in {}", pdfs.len(), input_dir.display());

    let mut summary = RunSummary::default();
    for pdf_path in pdfs {
        let out_path = markdown_path_for(&pdf_path, output_dir);
        info!(
            "Converting {} -> {}",
            pdf_path.display(),
            out_path.display()
        );

        let outcome = match convert::convert_to_file(&pdf_path, &out_path, config).await {
            Ok(stats) => DocumentOutcome {
                pdf_path,
                output_path: Some(out_path),
                stats: Some(stats),
                error: None,
            },
            Err(e) => {
                error!("Failed to convert {}: {}", pdf_path.display(), e);
                DocumentOutcome {
                    pdf_path,
                    output_path: None,
                    stats: None,
                    error: Some(e),
                }
            }
        };
        summary.outcomes.push(outcome);
    }

    info!(
        "Batch complete: {} converted, {} failed",
        summary.converted(),
        summary.failed()
    );
    Ok(summary)
}

/// List the PDFs in `dir`, matched by extension case-insensitively and
/// sorted by file name for a deterministic processing order.
fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>, PdfMillError> {
    let entries = std::fs::read_dir(dir).map_err(|e| PdfMillError::InputDirUnreadable {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut pdfs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                    .unwrap_or(false)
        })
        .collect();
    pdfs.sort();
    Ok(pdfs)
}
