//! # pdfmill
//!
//! Convert PDF documents to clean Markdown using vision-capable language
//! models — without sending every page through one.
//!
//! Each page is classified by how much of its area is covered by extractable
//! text glyphs. Text-dominant pages are extracted directly (fast, free,
//! lossless); image-heavy pages are rasterised and interpreted by a vision
//! model that transcribes tables, renders diagrams as ASCII, and describes
//! figures. The assembled document then gets one LLM cleanup pass for
//! consistent formatting.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use pdfmill::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), pdfmill::PdfMillError> {
//!     // Reads OPENAI_API_KEY (or other provider keys) from the environment.
//!     let config = ConversionConfig::default();
//!     let output = convert("report.pdf", &config).await?;
//!     println!("{}", output.markdown);
//!     eprintln!(
//!         "{} pages ({} direct, {} vision)",
//!         output.stats.total_pages,
//!         output.stats.direct_pages,
//!         output.stats.vision_pages
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Failure containment
//!
//! A single bad page never voids a document: read, render, and model
//! failures become visible placeholder blockquotes in the output, and
//! `stats.failed_pages` reports how many. Only document-fatal conditions
//! (missing file, corrupt PDF, no configured provider) return `Err`.
//!
//! ## Requirements
//!
//! * A pdfium library findable at runtime (bundled via the
//!   `pdfium-render` crate's `pdfium_latest` feature, or pointed to with
//!   `PDFIUM_DYNAMIC_LIB_PATH`).
//! * An LLM provider API key in the environment, a `provider_name` in the
//!   config, or an injected [`ChatModel`] implementation.

pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

pub use batch::{convert_dir, DocumentOutcome, RunSummary};
pub use config::{ConversionConfig, ConversionConfigBuilder, PageSeparator};
pub use convert::{convert, convert_sync, convert_to_file};
pub use error::{PageError, PdfMillError};
pub use model::{ChatModel, ChatReply, ChatRequest, ModelError};
pub use output::{
    ContentSource, ConversionOutput, ConversionStats, PageKind, PageResult, PageSurvey,
};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
