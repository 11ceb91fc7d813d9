//! Data model for conversion results.
//!
//! A run flows through three shapes: [`PageSurvey`] (what the loader saw on
//! each page), [`PageResult`] (what the extractor produced for it), and
//! [`ConversionOutput`] (the assembled, cleaned document plus stats).
//! Everything user-facing is serde-serialisable so the CLI can emit JSON.

use crate::error::PageError;
use serde::{Deserialize, Serialize};

/// Classification tag for a page.
///
/// TEXT pages are extracted directly; MIXED pages (image-heavy or with no
/// extractable text at all) are rasterised and interpreted by the vision
/// model. The two variants dispatch to the two extraction strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageKind {
    /// Extractable text covers at least the configured area threshold.
    Text,
    /// Below the text-area threshold, including pure-image pages.
    Mixed,
}

/// Per-page geometry and raw text, gathered in a single pdfium pass.
///
/// Created during load, read-only after classification. Areas are in
/// square PDF points; only their ratio matters.
#[derive(Debug, Clone)]
pub struct PageSurvey {
    /// 0-based page index.
    pub index: usize,
    /// Total page area (width × height).
    pub total_area: f32,
    /// Summed area of the text glyph bounding boxes.
    pub text_area: f32,
    /// Raw extracted text, empty when the page has none.
    pub text: String,
}

impl PageSurvey {
    /// Fraction of the page covered by text glyphs. Zero for degenerate
    /// (zero-area) pages so they classify as MIXED.
    pub fn text_coverage_ratio(&self) -> f32 {
        if self.total_area <= 0.0 {
            0.0
        } else {
            self.text_area / self.total_area
        }
    }
}

/// How a page's markdown fragment was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentSource {
    /// Raw text pulled straight from the PDF, no model call.
    DirectExtraction,
    /// Vision-model interpretation of the rasterised page.
    LlmVision,
}

/// The outcome for a single page.
///
/// `error` is `Some` when the page failed (unreadable, or the model call
/// exhausted its retries); the assembler then emits a visible placeholder
/// in the page's slot instead of its content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 0-based page index.
    pub index: usize,
    /// Extracted or interpreted markdown fragment. Empty when `error` is set.
    pub markdown: String,
    /// Which extraction strategy produced the fragment.
    pub source: ContentSource,
    /// Retries that were needed before success (0 = first attempt worked).
    pub retries: u32,
    /// Wall-clock time spent on this page.
    pub duration_ms: u64,
    /// Token usage reported by the provider; zero for direct extraction.
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// Set when the page failed despite retries.
    pub error: Option<PageError>,
}

impl PageResult {
    /// A successful direct-extraction result.
    pub fn direct(index: usize, markdown: String) -> Self {
        Self {
            index,
            markdown,
            source: ContentSource::DirectExtraction,
            retries: 0,
            duration_ms: 0,
            input_tokens: 0,
            output_tokens: 0,
            error: None,
        }
    }

    /// A failed page; the fragment becomes a placeholder at assembly time.
    pub fn failed(index: usize, source: ContentSource, error: PageError) -> Self {
        Self {
            index,
            markdown: String::new(),
            source,
            retries: 0,
            duration_ms: 0,
            input_tokens: 0,
            output_tokens: 0,
            error: Some(error),
        }
    }
}

/// Aggregate statistics for one document conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages extracted directly (TEXT).
    pub direct_pages: usize,
    /// Pages interpreted by the vision model (MIXED).
    pub vision_pages: usize,
    /// Pages replaced by a placeholder after errors.
    pub failed_pages: usize,
    /// Cleanup chunks the assembled document was split into (1 = no split).
    pub cleanup_chunks: usize,
    /// Token usage summed over all model calls, as reported by the provider.
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    /// End-to-end wall-clock duration.
    pub total_duration_ms: u64,
    /// Time spent in model calls (extraction + cleanup).
    pub llm_duration_ms: u64,
}

/// The result of converting one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Final cleaned markdown.
    pub markdown: String,
    /// Per-page results in ascending index order.
    pub pages: Vec<PageResult>,
    pub stats: ConversionStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_ratio_normal() {
        let survey = PageSurvey {
            index: 0,
            total_area: 1000.0,
            text_area: 950.0,
            text: "body".into(),
        };
        assert!((survey.text_coverage_ratio() - 0.95).abs() < 1e-6);
    }

    #[test]
    fn coverage_ratio_zero_area_page() {
        let survey = PageSurvey {
            index: 0,
            total_area: 0.0,
            text_area: 0.0,
            text: String::new(),
        };
        assert_eq!(survey.text_coverage_ratio(), 0.0);
    }

    #[test]
    fn page_result_roundtrips_through_json() {
        let result = PageResult::direct(2, "# Heading".into());
        let json = serde_json::to_string(&result).unwrap();
        let back: PageResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.index, 2);
        assert_eq!(back.source, ContentSource::DirectExtraction);
        assert!(back.error.is_none());
    }
}
