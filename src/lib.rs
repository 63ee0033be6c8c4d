//! # pdf-ocr
//!
//! Extract the text of PDF documents by rasterising every page and running
//! OCR over it.
//!
//! ## Why rasterise?
//!
//! Scanned PDFs carry no text layer at all, and many "digital" PDFs carry a
//! broken one (glyphs without a Unicode mapping, text drawn as curves).
//! Rendering each page to an image and reading it back with an OCR engine
//! works the same way for both, at the cost of CPU time per page.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Upload     validate media type / magic bytes
//!  ├─ 2. Render     rasterise pages via pdfium into a scratch dir (spawn_blocking)
//!  ├─ 3. Normalize  resize 2000 px → grayscale → contrast stretch → sharpen
//!  ├─ 4. OCR        one tesseract process per page, kill-on-drop
//!  ├─ 5. Clean      deterministic whitespace / invisible-char cleanup
//!  └─ 6. Output     `--- Page N ---` segments + per-page results and stats
//! ```
//!
//! A page that fails at step 3 or 4 contributes the placeholder
//! `[Error extracting text from this page]`; only setup failures abort.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_ocr::{ExtractionConfig, Extractor, LanguageHint};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // pdfium from PDFIUM_LIB_PATH or the system, tesseract from PATH
//!     let extractor = Extractor::from_env(ExtractionConfig::default());
//!     let output = extractor
//!         .extract_file(Path::new("scan.pdf"), &LanguageHint::new("eng"))
//!         .await?;
//!     println!("{}", output.text);
//!     eprintln!("{} pages, {} failed", output.page_count(), output.stats.failed_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-ocr` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdf-ocr = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime Requirements
//!
//! | Dependency | Located via |
//! |------------|-------------|
//! | libpdfium  | `PDFIUM_LIB_PATH` (directory), else the system library path |
//! | tesseract  | `TESSERACT_CMD`, else `tesseract` on `PATH`, plus traineddata for each language |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, DEFAULT_LANGUAGE};
pub use error::{OcrError, PageError, RecognitionError, ValidationError};
pub use extract::{assemble_text, Extractor};
pub use output::{
    ExtractionOutput, ExtractionResponse, ExtractionStats, PageImage, PageResult,
    PAGE_PLACEHOLDER,
};
pub use pipeline::recognize::{LanguageHint, TesseractCli, TextRecognizer};
pub use pipeline::render::{PageRasterizer, PdfiumRasterizer};
pub use pipeline::upload::UploadedFile;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use server::router;
