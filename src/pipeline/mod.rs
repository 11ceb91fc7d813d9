//! The conversion pipeline, in data-flow order.
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Survey    open via pdfium; per-page area, text area, raw text
//!  ├─ 2. Classify  text-coverage ratio vs threshold → TEXT or MIXED
//!  ├─ 3. Render    rasterise MIXED pages only (CPU-bound, spawn_blocking)
//!  ├─ 4. Encode    PNG → base64 ImageData
//!  ├─ 5. Extract   TEXT → verbatim; MIXED → vision model (retry + backoff)
//!  ├─ 6. Assemble  join fragments in page order; chunk at page boundaries
//!  ├─ 7. Cleanup   LLM pass per chunk, then deterministic polish
//!  └─ 8. Write     collision-safe markdown file
//! ```

pub mod assemble;
pub mod classify;
pub mod encode;
pub mod llm;
pub mod postprocess;
pub mod render;
pub mod survey;
pub mod write;
