//! Document assembly: page fragments → ordered markdown, chunked for cleanup.
//!
//! Pages are always emitted in ascending index order, whatever order they
//! were processed in. A failed page contributes a visible placeholder
//! blockquote instead of silently vanishing, so readers can tell exactly
//! which page is missing and why.
//!
//! ## Chunking
//!
//! The cleanup model has a bounded context, so an oversized document is
//! split into chunks measured in characters (roughly 4 characters per
//! token). Chunk boundaries fall only between pages — a page's fragment is
//! never split across two chunks — and a single page larger than the whole
//! budget gets a chunk to itself.

use crate::config::PageSeparator;
use crate::output::PageResult;

/// Render one page's fragment: its markdown, or a placeholder when the
/// page failed.
pub fn page_fragment(result: &PageResult) -> String {
    match &result.error {
        None => result.markdown.clone(),
        Some(e) => format!(
            "> **Page {} could not be converted:** {}",
            result.index + 1,
            e
        ),
    }
}

/// Join all page fragments in ascending index order with the separator.
pub fn assemble(pages: &[PageResult], separator: &PageSeparator) -> String {
    let mut chunks = assemble_chunks(pages, separator, usize::MAX);
    debug_assert!(chunks.len() <= 1);
    chunks.pop().unwrap_or_default()
}

/// Join page fragments in ascending index order, splitting into chunks of
/// at most `budget_chars` characters at page boundaries.
///
/// Each returned chunk is already separator-joined and ready for one
/// cleanup call. The page order across the concatenation of all chunks is
/// identical to [`assemble`]'s output.
pub fn assemble_chunks(
    pages: &[PageResult],
    separator: &PageSeparator,
    budget_chars: usize,
) -> Vec<String> {
    let mut ordered: Vec<&PageResult> = pages.iter().collect();
    ordered.sort_by_key(|p| p.index);

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for page in ordered {
        let fragment = page_fragment(page);
        let sep = separator.render(page.index + 1);

        if current.is_empty() {
            current = fragment;
        } else if current.len() + sep.len() + fragment.len() <= budget_chars {
            current.push_str(&sep);
            current.push_str(&fragment);
        } else {
            chunks.push(current);
            current = fragment;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
