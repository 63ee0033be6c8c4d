//! Pipeline stages for PDF-to-text extraction.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different OCR engine) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ render ──▶ normalize ──▶ recognize ──▶ postprocess
//! (bytes)   (pdfium)   (image ops)   (tesseract)   (cleanup)
//!              │
//!           scratch (per-extraction directory, removed on drop)
//! ```
//!
//! 1. [`upload`] : validate the submitted file (media type, emptiness,
//!    `%PDF` magic for local files)
//! 2. [`scratch`]: create the per-extraction directory page images live in
//! 3. [`render`] : rasterise every page to PNG; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 4. [`normalize`]: resize, grayscale, contrast-stretch and sharpen each
//!    page image
//! 5. [`recognize`]: run OCR on the normalised image; the only stage that
//!    talks to an external process
//! 6. [`postprocess`]: deterministic text-cleanup rules

pub mod normalize;
pub mod postprocess;
pub mod recognize;
pub mod render;
pub mod scratch;
pub mod upload;
