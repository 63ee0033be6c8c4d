//! Error types for the pdf-ocr library.
//!
//! Three tiers of failure, each with its own type:
//!
//! * [`ValidationError`]: the upload itself is unusable (no file, wrong
//!   media type). Always a client error, never retried.
//!
//! * [`OcrError`] (**fatal**): the extraction cannot proceed at all
//!   (rasterisation failed, zero pages, scratch directory unavailable).
//!   Returned as `Err(OcrError)` from [`crate::extract::Extractor::extract`].
//!
//! * [`PageError`] (**non-fatal**): one page could not be normalised or
//!   recognised. Stored inside [`crate::output::PageResult`]; the page's
//!   text becomes a placeholder and the remaining pages carry on.
//!
//! [`RecognitionError`] is the recognition adapter's own error. The
//! orchestrator folds it into [`PageError::Recognition`].

use std::path::PathBuf;
use thiserror::Error;

/// The upload did not carry a usable PDF.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No `file` field was present in the submission.
    #[error("No file uploaded")]
    MissingFile,

    /// The `file` field declared a media type other than `application/pdf`.
    #[error("Only PDF files are allowed (got '{found}')")]
    UnsupportedType { found: String },

    /// More than one field carried a file.
    #[error("Exactly one file must be uploaded")]
    MultipleFiles,

    /// The file field was present but carried zero bytes.
    #[error("Uploaded file is empty")]
    EmptyFile,

    /// The request body exceeded the upload limit.
    #[error("Uploaded file is too large")]
    TooLarge,

    /// The multipart body could not be read.
    #[error("Malformed upload: {0}")]
    Multipart(String),
}

/// All fatal errors returned by the pdf-ocr library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum OcrError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The upload was rejected before any processing started.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A local input file does not exist.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// A local input file exists but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The document could not be parsed or a page could not be rendered.
    #[error("PDF rasterisation failed: {detail}")]
    Rasterization { detail: String },

    /// Rasterisation succeeded but produced no page images.
    #[error("No pages found in PDF")]
    NoPages,

    /// The document has more pages than the configured cap.
    #[error("PDF has {pages} pages; at most {max} are accepted")]
    PageLimitExceeded { pages: usize, max: usize },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH to the directory holding libpdfium, or install it system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The per-request scratch directory could not be created.
    #[error("Failed to create scratch directory under '{root}': {source}")]
    Scratch {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrError {
    /// Short, caller-facing message with no adapter diagnostics.
    ///
    /// The HTTP boundary serialises this instead of `Display`, which may
    /// carry pdfium or file-system detail.
    pub fn public_message(&self) -> String {
        match self {
            OcrError::Validation(v) => match v {
                ValidationError::Multipart(_) => "Malformed upload".to_string(),
                other => other.to_string(),
            },
            OcrError::FileNotFound { .. } => "PDF file not found".to_string(),
            OcrError::NotAPdf { .. } => "File is not a valid PDF".to_string(),
            OcrError::Rasterization { .. } => {
                "PDF could not be converted to images".to_string()
            }
            OcrError::NoPages => "No pages found in PDF".to_string(),
            OcrError::PageLimitExceeded { pages, max } => {
                format!("PDF has {pages} pages; at most {max} are accepted")
            }
            OcrError::PdfiumBindingFailed(_)
            | OcrError::Scratch { .. }
            | OcrError::InvalidConfig(_)
            | OcrError::Internal(_) => "OCR processing failed".to_string(),
        }
    }

    /// True for errors caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            OcrError::Validation(_)
                | OcrError::FileNotFound { .. }
                | OcrError::NotAPdf { .. }
                | OcrError::PageLimitExceeded { .. }
        )
    }
}

/// A non-fatal error for a single page.
///
/// Stored alongside [`crate::output::PageResult`] when a page fails.
/// The extraction always continues with the next page.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The rasterised image could not be decoded or filtered.
    #[error("Page {page}: image processing failed: {detail}")]
    ImageProcessing { page: usize, detail: String },

    /// The OCR engine failed to initialise or to recognise the page.
    #[error("Page {page}: recognition failed: {detail}")]
    Recognition { page: usize, detail: String },

    /// Recognition did not finish within the per-page budget.
    #[error("Page {page}: recognition timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },
}

impl PageError {
    /// 1-indexed page number the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::ImageProcessing { page, .. }
            | PageError::Recognition { page, .. }
            | PageError::Timeout { page, .. } => *page,
        }
    }
}

/// Errors raised by a [`crate::pipeline::recognize::TextRecognizer`].
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// The engine could not be started for the requested language.
    #[error("OCR engine could not be initialised for '{language}': {detail}")]
    EngineInit { language: String, detail: String },

    /// The engine started but recognition itself failed.
    #[error("OCR engine failed: {0}")]
    Failed(String),

    /// Talking to the engine process failed.
    #[error("OCR engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}
