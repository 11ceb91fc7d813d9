//! Rasterisation of MIXED pages via pdfium.
//!
//! Only pages headed for the vision model are rendered; TEXT pages never
//! pay this cost. Rendering is CPU-bound C++ work, so it runs inside
//! `spawn_blocking`. The longest image edge is capped by
//! `max_rendered_pixels` regardless of physical page size: an A0 poster
//! would otherwise rasterise to tens of thousands of pixels per side and
//! exhaust memory, while vision models see best around 1,000–2,000 px.

use crate::config::ConversionConfig;
use crate::error::{PageError, PdfMillError};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, warn};

/// Rasterise the given pages (0-based indices) into images.
///
/// Per-page render failures are contained: the slot holds
/// `Err(PageError::RenderFailed)` and the extractor turns it into a
/// placeholder, leaving the other pages untouched.
pub async fn render_pages(
    pdf_path: &Path,
    config: &ConversionConfig,
    page_indices: &[usize],
) -> Result<Vec<(usize, Result<DynamicImage, PageError>)>, PdfMillError> {
    let path = pdf_path.to_path_buf();
    let max_pixels = config.max_rendered_pixels;
    let indices = page_indices.to_vec();

    tokio::task::spawn_blocking(move || render_pages_blocking(&path, max_pixels, &indices))
        .await
        .map_err(|e| PdfMillError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_pages_blocking(
    pdf_path: &Path,
    max_pixels: u32,
    page_indices: &[usize],
) -> Result<Vec<(usize, Result<DynamicImage, PageError>)>, PdfMillError> {
    let pdfium = super::survey::bind_pdfium()?;

    let document =
        pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| PdfMillError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut results = Vec::with_capacity(page_indices.len());

    for &idx in page_indices {
        if idx >= total_pages {
            warn!("Skipping page {} (out of range)", idx + 1);
            continue;
        }

        let rendered = pages
            .get(idx as u16)
            .and_then(|page| page.render_with_config(&render_config).map(|b| b.as_image()));

        match rendered {
            Ok(image) => {
                debug!(
                    "Rendered page {} → {}x{} px",
                    idx + 1,
                    image.width(),
                    image.height()
                );
                results.push((idx, Ok(image)));
            }
            Err(e) => {
                warn!("Rasterisation failed for page {}: {:?}", idx + 1, e);
                results.push((
                    idx,
                    Err(PageError::RenderFailed {
                        page: idx + 1,
                        detail: format!("{:?}", e),
                    }),
                ));
            }
        }
    }

    Ok(results)
}
