//! Configuration types for PDF-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to pass the same settings to every pipeline stage and to diff
//! two runs to understand why their outputs differ. Nothing in the crate
//! reads process-wide mutable state: the config object is constructed once
//! and handed to each component.

use crate::error::PdfMillError;
use crate::model::ChatModel;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for a PDF-to-Markdown conversion run.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdfmill::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .vision_model("gpt-4o")
///     .image_area_threshold(0.85)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Model identifier used to interpret MIXED (image-heavy) pages.
    /// Must be vision-capable. Default: "gpt-4o".
    pub vision_model: String,

    /// Model identifier for the final cleanup pass. Plain text in, plain
    /// text out, so a cheaper non-vision model works fine. Default: "gpt-4o-mini".
    pub cleanup_model: String,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If `None`, the provider is auto-detected from API key environment
    /// variables.
    pub provider_name: Option<String>,

    /// Pre-constructed model used for both the vision and cleanup roles.
    /// Takes precedence over `provider_name`. Intended for tests and for
    /// callers that wrap providers in middleware.
    pub chat_override: Option<Arc<dyn ChatModel>>,

    /// Sampling temperature for every model call. Default: 0.0.
    ///
    /// Zero keeps the model deterministic and faithful to what is on the
    /// page, which is what transcription wants.
    pub temperature: f32,

    /// Maximum tokens the model may generate per call. Default: 4096.
    pub max_tokens: usize,

    /// Text-coverage ratio at or above which a page counts as TEXT and is
    /// extracted directly without a model call. Must be in [0, 1].
    /// Default: 0.9.
    ///
    /// A page's ratio is the area covered by its text glyph bounding boxes
    /// divided by the total page area. Pages below the threshold (including
    /// pure-image pages and pages with no extractable text) go to the
    /// vision model.
    pub image_area_threshold: f32,

    /// Maximum retry attempts on a failed model call. Default: 3.
    ///
    /// Rate limits and 5xx errors are transient; three retries catch the
    /// vast majority. After exhaustion the page becomes a visible
    /// placeholder rather than aborting the document.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubling per attempt
    /// (1 s → 2 s → 4 s). Default: 1000.
    pub retry_backoff_ms: u64,

    /// Per-model-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Maximum rendered image dimension (width or height) in pixels when
    /// rasterising MIXED pages. Default: 2000.
    ///
    /// Caps memory regardless of physical page size and keeps images in
    /// the resolution sweet spot for vision models.
    pub max_rendered_pixels: u32,

    /// Character budget for one cleanup-pass chunk. Default: 24 000
    /// (roughly 6 000 tokens at ~4 characters per token).
    ///
    /// When the assembled document exceeds this, it is split into chunks at
    /// page boundaries and each chunk is cleaned independently.
    pub cleanup_chunk_chars: usize,

    /// Page separator in the assembled output. Default: blank line.
    pub page_separator: PageSeparator,

    /// Optional per-page progress callback (used by the CLI progress bar).
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            vision_model: "gpt-4o".to_string(),
            cleanup_model: "gpt-4o-mini".to_string(),
            provider_name: None,
            chat_override: None,
            temperature: 0.0,
            max_tokens: 4096,
            image_area_threshold: 0.9,
            max_retries: 3,
            retry_backoff_ms: 1000,
            api_timeout_secs: 60,
            max_rendered_pixels: 2000,
            cleanup_chunk_chars: 24_000,
            page_separator: PageSeparator::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("vision_model", &self.vision_model)
            .field("cleanup_model", &self.cleanup_model)
            .field("provider_name", &self.provider_name)
            .field(
                "chat_override",
                &self.chat_override.as_ref().map(|_| "<dyn ChatModel>"),
            )
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("image_area_threshold", &self.image_area_threshold)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("cleanup_chunk_chars", &self.cleanup_chunk_chars)
            .field("page_separator", &self.page_separator)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.config.vision_model = model.into();
        self
    }

    pub fn cleanup_model(mut self, model: impl Into<String>) -> Self {
        self.config.cleanup_model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn chat_override(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.config.chat_override = Some(model);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn image_area_threshold(mut self, ratio: f32) -> Self {
        self.config.image_area_threshold = ratio;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn cleanup_chunk_chars(mut self, chars: usize) -> Self {
        self.config.cleanup_chunk_chars = chars;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Violations are configuration errors and abort the run before any
    /// document is opened.
    pub fn build(self) -> Result<ConversionConfig, PdfMillError> {
        let c = &self.config;
        if !(0.0..=1.0).contains(&c.image_area_threshold) {
            return Err(PdfMillError::InvalidConfig(format!(
                "image_area_threshold must be in [0, 1], got {}",
                c.image_area_threshold
            )));
        }
        if c.max_tokens == 0 {
            return Err(PdfMillError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.cleanup_chunk_chars == 0 {
            return Err(PdfMillError::InvalidConfig(
                "cleanup_chunk_chars must be ≥ 1".into(),
            ));
        }
        if c.vision_model.is_empty() || c.cleanup_model.is_empty() {
            return Err(PdfMillError::InvalidConfig(
                "model identifiers must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// How to separate pages in the assembled Markdown output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSeparator {
    /// No separator; pages joined with a blank line. (default)
    #[default]
    None,
    /// Horizontal rule: "\n\n---\n\n"
    HorizontalRule,
    /// HTML comment with page number: "<!-- page N -->"
    Comment,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator preceding the given page (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::None => "\n\n".to_string(),
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::Comment => format!("\n\n<!-- page {} -->\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ConversionConfig::builder().build().unwrap();
        assert_eq!(config.vision_model, "gpt-4o");
        assert_eq!(config.cleanup_model, "gpt-4o-mini");
        assert_eq!(config.image_area_threshold, 0.9);
        assert_eq!(config.temperature, 0.0);
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let err = ConversionConfig::builder()
            .image_area_threshold(1.5)
            .build()
            .unwrap_err();
        assert!(matches!(err, PdfMillError::InvalidConfig(_)));

        let err = ConversionConfig::builder()
            .image_area_threshold(-0.1)
            .build()
            .unwrap_err();
        assert!(matches!(err, PdfMillError::InvalidConfig(_)));
    }

    #[test]
    fn threshold_bounds_are_inclusive() {
        assert!(ConversionConfig::builder()
            .image_area_threshold(0.0)
            .build()
            .is_ok());
        assert!(ConversionConfig::builder()
            .image_area_threshold(1.0)
            .build()
            .is_ok());
    }

    #[test]
    fn zero_max_tokens_is_rejected() {
        let err = ConversionConfig::builder().max_tokens(0).build().unwrap_err();
        assert!(matches!(err, PdfMillError::InvalidConfig(_)));
    }

    #[test]
    fn empty_model_is_rejected() {
        let err = ConversionConfig::builder()
            .vision_model("")
            .build()
            .unwrap_err();
        assert!(matches!(err, PdfMillError::InvalidConfig(_)));
    }

    #[test]
    fn temperature_is_clamped() {
        let config = ConversionConfig::builder().temperature(5.0).build().unwrap();
        assert_eq!(config.temperature, 2.0);
    }

    #[test]
    fn separator_render() {
        assert_eq!(PageSeparator::None.render(3), "\n\n");
        assert_eq!(PageSeparator::HorizontalRule.render(3), "\n\n---\n\n");
        assert_eq!(PageSeparator::Comment.render(3), "\n\n<!-- page 3 -->\n\n");
        assert_eq!(
            PageSeparator::Custom("***".into()).render(3),
            "\n\n***\n\n"
        );
    }
}
