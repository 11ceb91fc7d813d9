//! PDF loading and per-page survey: geometry plus raw text in one pass.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is CPU-bound and not
//! safe to drive from async contexts. `tokio::task::spawn_blocking` moves
//! the work onto the blocking thread pool so Tokio workers never stall on
//! PDF parsing.
//!
//! ## What "text area" means
//!
//! The classifier needs the fraction of the page covered by extractable
//! text. We sum the loose bounding boxes of every text character reported
//! by pdfium. Summing (rather than computing the exact union) slightly
//! overstates coverage where glyph boxes overlap, which biases dense text
//! pages toward TEXT — the cheap path — and never turns an image page into
//! a TEXT page, since images contribute no glyphs.

use crate::error::{PageError, PdfMillError};
use crate::output::PageSurvey;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Bind to the pdfium library, honouring `PDFIUM_DYNAMIC_LIB_PATH` when set.
///
/// Falls back to the system library search path when the variable is unset
/// or empty. A binding failure means libpdfium itself could not be loaded,
/// which is a setup problem rather than anything wrong with the document.
pub(crate) fn bind_pdfium() -> Result<Pdfium, PdfMillError> {
    let bindings = match std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        Ok(dir) if !dir.is_empty() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
        }
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| PdfMillError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

/// Validate that `path` exists, is readable, and starts with the PDF magic
/// bytes, before handing it to pdfium.
pub fn validate_pdf_path(path: &Path) -> Result<(), PdfMillError> {
    if !path.exists() {
        return Err(PdfMillError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(PdfMillError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(PdfMillError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(PdfMillError::FileNotFound {
            path: path.to_path_buf(),
        }),
    }
}

/// Open the PDF and survey every page in index order.
///
/// Per-page failures are contained: an unreadable page yields
/// `Err(PageError::ReadFailed)` in its slot while the rest of the document
/// surveys normally. Only document-level problems (missing file, corrupt
/// header) are fatal.
pub async fn survey_pages(
    pdf_path: &Path,
) -> Result<Vec<Result<PageSurvey, PageError>>, PdfMillError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || survey_pages_blocking(&path))
        .await
        .map_err(|e| PdfMillError::Internal(format!("Survey task panicked: {}", e)))?
}

fn survey_pages_blocking(
    pdf_path: &PathBuf,
) -> Result<Vec<Result<PageSurvey, PageError>>, PdfMillError> {
    let pdfium = bind_pdfium()?;

    let document =
        pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| PdfMillError::CorruptPdf {
                path: pdf_path.clone(),
                detail: format!("{:?}", e),
            })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    if total_pages == 0 {
        return Err(PdfMillError::NoPages {
            path: pdf_path.clone(),
        });
    }
    debug!("Surveying {} pages of {}", total_pages, pdf_path.display());

    let mut surveys = Vec::with_capacity(total_pages);

    for index in 0..total_pages {
        match pages.get(index as u16) {
            Ok(page) => surveys.push(Ok(survey_page(&page, index))),
            Err(e) => {
                warn!("Page {} could not be read: {:?}", index + 1, e);
                surveys.push(Err(PageError::ReadFailed {
                    page: index + 1,
                    detail: format!("{:?}", e),
                }));
            }
        }
    }

    Ok(surveys)
}

/// Survey a single page: total area, summed text glyph area, raw text.
///
/// A page where pdfium cannot produce a text object is treated as having
/// no extractable text (it will classify as MIXED), matching the safe
/// default for scanned or image-only pages.
fn survey_page(page: &PdfPage, index: usize) -> PageSurvey {
    let total_area = page.width().value * page.height().value;

    let (text, text_area) = match page.text() {
        Ok(page_text) => {
            let raw = page_text.all();
            let area = glyph_area(&page_text);
            (raw, area)
        }
        Err(_) => (String::new(), 0.0),
    };

    debug!(
        "Page {}: area={:.0}pt², text_area={:.0}pt², {} chars of text",
        index + 1,
        total_area,
        text_area,
        text.len()
    );

    PageSurvey {
        index,
        total_area,
        text_area,
        text,
    }
}

/// Sum the loose bounding boxes of every text character on the page.
fn glyph_area(page_text: &PdfPageText) -> f32 {
    let mut area = 0.0f32;
    for segment in page_text.segments().iter() {
        if let Ok(chars) = segment.chars() {
            for ch in chars.iter() {
                if let Ok(bounds) = ch.loose_bounds() {
                    area += bounds.width().value * bounds.height().value;
                }
            }
        }
    }
    area
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_file_not_found() {
        let err = validate_pdf_path(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, PdfMillError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_magic_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04 definitely a zip").unwrap();
        let err = validate_pdf_path(f.path()).unwrap_err();
        assert!(matches!(err, PdfMillError::NotAPdf { .. }));
    }

    #[test]
    fn pdf_magic_is_accepted() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n%rest of file").unwrap();
        assert!(validate_pdf_path(f.path()).is_ok());
    }

    #[test]
    fn bad_library_path_is_a_binding_error() {
        std::env::set_var("PDFIUM_DYNAMIC_LIB_PATH", "/definitely/not/a/lib/dir");
        let result = bind_pdfium();
        std::env::remove_var("PDFIUM_DYNAMIC_LIB_PATH");
        assert!(matches!(result, Err(PdfMillError::PdfiumBindingFailed(_))));
    }
}
