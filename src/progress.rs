//! Progress-callback trait for per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through a document. Callbacks are the
//! least-invasive integration point: the CLI forwards them to a terminal
//! progress bar, while other hosts can forward to channels or log records
//! without the library knowing how.

use crate::output::PageKind;
use std::sync::Arc;

/// Called by the conversion pipeline as it processes each page and runs the
/// cleanup pass. All methods have default no-op implementations so callers
/// only override what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after the PDF is opened and its page count is known.
    fn on_document_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after a page is classified, just before its content is
    /// extracted or sent to the vision model.
    fn on_page_start(&self, page_num: usize, total_pages: usize, kind: PageKind) {
        let _ = (page_num, total_pages, kind);
    }

    /// Called when a page's fragment is ready.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, markdown_len: usize) {
        let _ = (page_num, total_pages, markdown_len);
    }

    /// Called when a page fails after all retries are exhausted.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once before the cleanup pass, with the number of chunks the
    /// assembled document was split into (1 when no split was needed).
    fn on_cleanup_start(&self, chunks: usize) {
        let _ = chunks;
    }

    /// Called once after the cleanup pass.
    fn on_document_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCallback {
        pages: AtomicUsize,
        errors: AtomicUsize,
    }

    impl ConversionProgressCallback for CountingCallback {
        fn on_page_complete(&self, _page: usize, _total: usize, _len: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_error(&self, _page: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_document_start(3);
        cb.on_page_start(1, 3, PageKind::Text);
        cb.on_page_complete(1, 3, 42);
        cb.on_page_error(2, 3, "boom");
        cb.on_cleanup_start(1);
        cb.on_document_complete(3, 2);
    }

    #[test]
    fn counting_callback_receives_events() {
        let cb = CountingCallback {
            pages: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        };
        cb.on_page_complete(1, 3, 10);
        cb.on_page_complete(2, 3, 20);
        cb.on_page_error(3, 3, "model timeout");
        assert_eq!(cb.pages.load(Ordering::SeqCst), 2);
        assert_eq!(cb.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_document_start(10);
        cb.on_page_start(1, 10, PageKind::Mixed);
    }
}
