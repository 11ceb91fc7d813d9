//! Output writing: collision-safe markdown files.
//!
//! The output path is the input stem with a `.md` extension in the output
//! directory. Existing files are never overwritten: a numeric suffix is
//! appended (`report.md`, `report 2.md`, `report 3.md`, …) so re-running a
//! conversion always produces a new file. Writes go through a temp file
//! plus rename so a crash mid-write never leaves a truncated document.

use crate::error::PdfMillError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Derive the markdown output path for `pdf_path` inside `output_dir`,
/// avoiding collisions with existing files.
pub fn markdown_path_for(pdf_path: &Path, output_dir: &Path) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    unique_path(output_dir, &stem, "md")
}

/// First free path of the form `dir/stem.ext`, `dir/stem 2.ext`,
/// `dir/stem 3.ext`, …
fn unique_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let candidate = dir.join(format!("{stem}.{ext}"));
    if !candidate.exists() {
        return candidate;
    }

    let mut counter = 2u32;
    loop {
        let candidate = dir.join(format!("{stem} {counter}.{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Write `markdown` to `path` atomically, creating missing parent
/// directories. Failures abort the current document (the batch runner
/// reports them and continues with the next file).
pub async fn write_markdown(path: &Path, markdown: &str) -> Result<(), PdfMillError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PdfMillError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown)
        .await
        .map_err(|e| PdfMillError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| PdfMillError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    debug!("Wrote {} bytes to {}", markdown.len(), path.display());
    Ok(())
}
