//! Single-document conversion: the per-document state machine.
//!
//! A document moves through LOADED → CLASSIFIED → EXTRACTED → ASSEMBLED →
//! CLEANED → WRITTEN. Pages are processed sequentially in index order;
//! per-page failures are contained as placeholders, so the only errors that
//! escape this module are document-fatal ones (bad file, no provider,
//! output not writable).

use crate::config::ConversionConfig;
use crate::error::{PageError, PdfMillError};
use crate::model::{resolve_models, ResolvedModels};
use crate::output::{ContentSource, ConversionOutput, ConversionStats, PageKind, PageResult};
use crate::pipeline::{assemble, classify, encode, llm, postprocess, render, survey, write};
use image::DynamicImage;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Convert a PDF file to Markdown.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(ConversionOutput)` on success, even when some pages failed — failed
/// pages appear as visible placeholders (check `output.stats.failed_pages`).
///
/// # Errors
/// Returns `Err(PdfMillError)` only for document-fatal conditions:
/// missing/unreadable file, not a PDF, corrupt document, or no usable LLM
/// provider.
pub async fn convert(
    pdf_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, PdfMillError> {
    let total_start = Instant::now();
    let pdf_path = pdf_path.as_ref();
    info!("Starting conversion: {}", pdf_path.display());

    survey::validate_pdf_path(pdf_path)?;

    // Provider problems are configuration errors; surface them before any
    // page work begins.
    let models = resolve_models(config)?;

    // ── Load + survey ────────────────────────────────────────────────────
    let surveys = survey::survey_pages(pdf_path).await?;
    let total_pages = surveys.len();
    info!("Loaded {} pages", total_pages);

    if let Some(ref cb) = config.progress_callback {
        cb.on_document_start(total_pages);
    }

    // ── Classify ─────────────────────────────────────────────────────────
    let kinds: Vec<Option<PageKind>> = surveys
        .iter()
        .map(|slot| {
            slot.as_ref()
                .ok()
                .map(|s| classify::classify(s, config.image_area_threshold))
        })
        .collect();

    let mixed_indices: Vec<usize> = kinds
        .iter()
        .enumerate()
        .filter(|(_, k)| matches!(k, Some(PageKind::Mixed)))
        .map(|(i, _)| i)
        .collect();
    info!(
        "Classified: {} text, {} mixed",
        total_pages - mixed_indices.len(),
        mixed_indices.len()
    );

    // ── Rasterise MIXED pages only ───────────────────────────────────────
    let mut images: HashMap<usize, Result<DynamicImage, PageError>> = if mixed_indices.is_empty() {
        HashMap::new()
    } else {
        render::render_pages(pdf_path, config, &mixed_indices)
            .await?
            .into_iter()
            .collect()
    };

    // ── Extract, sequentially in index order ─────────────────────────────
    let llm_start = Instant::now();
    let mut pages: Vec<PageResult> = Vec::with_capacity(total_pages);

    for (index, slot) in surveys.into_iter().enumerate() {
        let kind = kinds[index];
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(index + 1, total_pages, kind.unwrap_or(PageKind::Mixed));
        }

        let result = match (slot, kind) {
            (Err(read_error), _) => {
                PageResult::failed(index, ContentSource::DirectExtraction, read_error)
            }
            (Ok(survey), Some(PageKind::Text)) => {
                debug!("Page {}: direct extraction", index + 1);
                PageResult::direct(index, survey.text)
            }
            (Ok(_), _) => extract_mixed_page(index, images.remove(&index), &models, config).await,
        };

        if let Some(ref cb) = config.progress_callback {
            match &result.error {
                None => cb.on_page_complete(index + 1, total_pages, result.markdown.len()),
                Some(e) => cb.on_page_error(index + 1, total_pages, &e.to_string()),
            }
        }
        pages.push(result);
    }

    // ── Assemble, chunked at page boundaries ─────────────────────────────
    let chunks = assemble::assemble_chunks(&pages, &config.page_separator, config.cleanup_chunk_chars);
    let chunk_count = chunks.len();
    info!("Assembled document into {} cleanup chunk(s)", chunk_count);

    if let Some(ref cb) = config.progress_callback {
        cb.on_cleanup_start(chunk_count);
    }

    // ── Cleanup pass ─────────────────────────────────────────────────────
    let mut cleaned_parts: Vec<String> = Vec::with_capacity(chunk_count);
    let mut cleanup_input_tokens = 0u64;
    let mut cleanup_output_tokens = 0u64;

    for (i, chunk) in chunks.iter().enumerate() {
        let outcome = llm::cleanup_chunk(&models.cleanup, chunk, i + 1, chunk_count, config).await;
        cleanup_input_tokens += outcome.input_tokens as u64;
        cleanup_output_tokens += outcome.output_tokens as u64;
        cleaned_parts.push(outcome.markdown);
    }

    let markdown = postprocess::polish(&cleaned_parts.join("\n\n"));
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    // ── Stats ────────────────────────────────────────────────────────────
    let direct = pages
        .iter()
        .filter(|p| p.error.is_none() && p.source == ContentSource::DirectExtraction)
        .count();
    let vision = pages
        .iter()
        .filter(|p| p.error.is_none() && p.source == ContentSource::LlmVision)
        .count();
    let failed = pages.iter().filter(|p| p.error.is_some()).count();

    let stats = ConversionStats {
        total_pages,
        direct_pages: direct,
        vision_pages: vision,
        failed_pages: failed,
        cleanup_chunks: chunk_count,
        total_input_tokens: pages.iter().map(|p| p.input_tokens as u64).sum::<u64>()
            + cleanup_input_tokens,
        total_output_tokens: pages.iter().map(|p| p.output_tokens as u64).sum::<u64>()
            + cleanup_output_tokens,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        llm_duration_ms,
    };

    info!(
        "Conversion complete: {}/{} pages ({} direct, {} vision), {}ms",
        total_pages - failed,
        total_pages,
        direct,
        vision,
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_document_complete(total_pages, total_pages - failed);
    }

    Ok(ConversionOutput {
        markdown,
        pages,
        stats,
    })
}

/// Convert a PDF and write the result to `output_path` (atomically, via a
/// temp file). The caller picks the path; use
/// [`crate::pipeline::write::markdown_path_for`] for collision-safe naming.
pub async fn convert_to_file(
    pdf_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, PdfMillError> {
    let output = convert(pdf_path, config).await?;
    write::write_markdown(output_path.as_ref(), &output.markdown).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`]. Creates a temporary tokio
/// runtime internally.
pub fn convert_sync(
    pdf_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, PdfMillError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PdfMillError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(pdf_path, config))
}

/// Run the vision path for one MIXED page: encode the rendered image and
/// interpret it, containing render/encode failures as placeholders.
async fn extract_mixed_page(
    index: usize,
    image: Option<Result<DynamicImage, PageError>>,
    models: &ResolvedModels,
    config: &ConversionConfig,
) -> PageResult {
    let image = match image {
        Some(Ok(img)) => img,
        Some(Err(e)) => return PageResult::failed(index, ContentSource::LlmVision, e),
        None => {
            return PageResult::failed(
                index,
                ContentSource::LlmVision,
                PageError::RenderFailed {
                    page: index + 1,
                    detail: "page was not rendered".into(),
                },
            )
        }
    };

    let encoded = match encode::encode_page(&image) {
        Ok(data) => data,
        Err(e) => {
            return PageResult::failed(
                index,
                ContentSource::LlmVision,
                PageError::RenderFailed {
                    page: index + 1,
                    detail: format!("image encoding failed: {}", e),
                },
            )
        }
    };

    let mut result = llm::interpret_page(&models.vision, index, encoded, config).await;
    if result.error.is_none() {
        result.markdown = postprocess::polish(&result.markdown);
    }
    result
}
