//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the orchestrator moves through the document: rasterising,
//! then one start/finish pair per page, then a final summary.
//!
//! # Example
//!
//! ```rust
//! use pdf_ocr::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} done ({} bytes)", page_num, total_pages, text_len);
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(cb as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::Serialize;
use std::sync::Arc;

/// Called by the extraction orchestrator as it processes each page.
///
/// All methods default to no-ops. With `page_concurrency > 1` the page
/// methods may be called from several tasks at once; protect shared state
/// with `Mutex` or atomics.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once, before the PDF is handed to the rasteriser.
    fn on_rasterize_start(&self) {}

    /// Called once the page images exist.
    ///
    /// # Arguments
    /// * `total_pages`: number of pages that will be recognised
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is normalised and recognised.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page is recognised.
    ///
    /// # Arguments
    /// * `page_num`: 1-indexed page number
    /// * `total_pages`: total pages
    /// * `text_len`: byte length of the recognised text
    fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
        let _ = (page_num, total_pages, text_len);
    }

    /// Called when a page falls back to placeholder text.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after all pages have been attempted.
    ///
    /// # Arguments
    /// * `total_pages`: pages rasterised
    /// * `success_count`: pages recognised without error
    fn on_extraction_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

/// Coarse state of an extraction, as reported to polling clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Converting,
    Extracting,
    Completed,
    Error,
}

/// Snapshot of where an extraction is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrProgress {
    pub page: usize,
    pub total_pages: usize,
    pub status: ProgressStatus,
}

/// Callback that forwards every event as an [`OcrProgress`] snapshot.
///
/// Handy for pushing progress into a channel:
///
/// ```rust
/// use pdf_ocr::progress::{OcrProgress, SnapshotCallback};
/// use tokio::sync::mpsc;
///
/// let (tx, mut rx) = mpsc::unbounded_channel::<OcrProgress>();
/// let cb = SnapshotCallback::new(move |p| { let _ = tx.send(p); });
/// ```
pub struct SnapshotCallback<F> {
    sink: F,
}

impl<F> SnapshotCallback<F>
where
    F: Fn(OcrProgress) + Send + Sync,
{
    pub fn new(sink: F) -> Self {
        Self { sink }
    }
}

impl<F> ExtractionProgressCallback for SnapshotCallback<F>
where
    F: Fn(OcrProgress) + Send + Sync,
{
    fn on_rasterize_start(&self) {
        (self.sink)(OcrProgress {
            page: 0,
            total_pages: 0,
            status: ProgressStatus::Converting,
        });
    }

    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        (self.sink)(OcrProgress {
            page: page_num,
            total_pages,
            status: ProgressStatus::Extracting,
        });
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, _error: &str) {
        (self.sink)(OcrProgress {
            page: page_num,
            total_pages,
            status: ProgressStatus::Error,
        });
    }

    fn on_extraction_complete(&self, total_pages: usize, _success_count: usize) {
        (self.sink)(OcrProgress {
            page: total_pages,
            total_pages,
            status: ProgressStatus::Completed,
        });
    }
}
