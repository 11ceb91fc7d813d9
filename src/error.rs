//! Error types for the pdfmill library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PdfMillError`] — **Fatal**: the document (or the whole run) cannot
//!   proceed. Bad input file, invalid configuration, no LLM provider, or an
//!   output directory that cannot be written. Returned as `Err(PdfMillError)`
//!   from the top-level `convert*` functions.
//!
//! * [`PageError`] — **Non-fatal**: a single page failed (unreadable page,
//!   LLM call exhausted its retries) but the rest of the document is fine.
//!   Stored inside [`crate::output::PageResult`]; the assembler replaces the
//!   page with a visible placeholder so one bad page never voids the
//!   document.
//!
//! Configuration errors surface before any page is touched; per-document
//! errors abort only that document, so a batch run over a directory keeps
//! going with the next file.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdfmill library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PdfMillError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The document contains no pages at all.
    #[error("PDF '{path}' contains no pages")]
    NoPages { path: PathBuf },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// No usable LLM provider (missing API key etc.). This is a
    /// configuration error: it aborts the run before any page is processed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file. Aborts the
    /// current document; the batch runner reports it and moves on.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not read the input directory during a batch run.
    #[error("Failed to read input directory '{path}': {source}")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed. Aborts the entire run.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_DYNAMIC_LIB_PATH to the directory containing libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Stored alongside [`crate::output::PageResult`] when a page fails.
/// The overall conversion continues; the assembler emits a placeholder
/// fragment in the page's slot.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The page could not be read from the PDF (corrupt object stream,
    /// unreadable content). Classification and extraction are skipped.
    #[error("Page {page}: could not be read: {detail}")]
    ReadFailed { page: usize, detail: String },

    /// Rasterisation of a MIXED page failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The vision LLM call failed after exhausting all retries.
    #[error("Page {page}: LLM call failed after {retries} retries: {detail}")]
    LlmFailed {
        page: usize,
        retries: u32,
        detail: String,
    },
}
