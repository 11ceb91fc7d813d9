//! Prompts for page interpretation and document cleanup.
//!
//! Every prompt the crate sends lives here, so changing model behaviour
//! means editing exactly one place, and unit tests can inspect prompts
//! without a live model.

/// Prompt sent with a rasterised MIXED page to the vision model.
pub const INTERPRETATION_PROMPT: &str = r#"Convert this PDF page image to a markdown document, aware that it forms part of a larger multipage document.

1. Preserve the original formatting of the document where possible.
2. Convert any tables to markdown tables.
3. For organisational charts or diagrams, create a text-based representation, for example:
```
Manager 1
    ├── Sub manager 1
        ├── Sub manager 4
```
4. Transcribe any visible text exactly; do not add text that is not in the original document.
5. If the page shows a page number, add it to the top of the output as "Page X".
6. If headers or footers carry the document title or effective date, include only the title, at the top.
7. Output only the markdown content, without wrapping it in code fences."#;

/// Prompt for one cleanup-pass invocation over `content` (a whole document
/// or a single chunk of it).
pub fn cleanup_prompt(content: &str) -> String {
    format!(
        "This document was produced by converting the pages of a PDF to markdown, \
partly via image transcription, and forms part of a larger document.\n\
Ensure the formatting is coherent and the heading structure is correct. \
Fix obvious structural breaks between pages.\n\
Preserve the content: do not summarise, and do not add anything new. \
Remove any stray mention of \"markdown\" from the top.\n\n{}",
        content
    )
}

/// Note appended to the cleanup prompt when the document was chunked, so
/// the model knows it is looking at a fragment rather than a whole.
pub fn chunk_part_note(part: usize, total_parts: usize) -> String {
    format!("\nThis is part {} of {}.", part, total_parts)
}
