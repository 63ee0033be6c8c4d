//! Output types produced by an extraction.

use crate::error::{OcrError, PageError};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::path::PathBuf;

/// Text substituted for a page whose normalisation or recognition failed.
pub const PAGE_PLACEHOLDER: &str = "[Error extracting text from this page]";

/// One rasterised page on disk, owned by the extraction that created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Location of the rendered image inside the scratch directory.
    pub path: PathBuf,
}

/// The outcome of normalising and recognising a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Recognised text; empty when `error` is set.
    pub text: String,
    /// Set when the page fell back to [`PAGE_PLACEHOLDER`].
    pub error: Option<PageError>,
    /// Wall-clock time spent on this page.
    pub duration_ms: u64,
}

impl PageResult {
    /// A page recognised successfully.
    pub fn ok(page_num: usize, text: String, duration_ms: u64) -> Self {
        Self {
            page_num,
            text,
            error: None,
            duration_ms,
        }
    }

    /// A page that failed; its text segment will be the placeholder.
    pub fn failed(page_num: usize, error: PageError, duration_ms: u64) -> Self {
        Self {
            page_num,
            text: String::new(),
            error: Some(error),
            duration_ms,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// The segment this page contributes to the assembled text.
    pub fn segment(&self) -> &str {
        if self.is_failed() {
            PAGE_PLACEHOLDER
        } else {
            &self.text
        }
    }
}

/// Timing and success counts for one extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages produced by the rasteriser.
    pub total_pages: usize,
    pub succeeded_pages: usize,
    pub failed_pages: usize,
    pub render_duration_ms: u64,
    pub ocr_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything an extraction returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// All page segments, each behind a `--- Page N ---` header, in page order.
    pub text: String,
    /// One entry per rasterised page, in page order.
    pub pages: Vec<PageResult>,
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    /// Number of pages rasterised, whether or not they were recognised.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages that fell back to the placeholder.
    pub fn failed_pages(&self) -> impl Iterator<Item = &PageResult> {
        self.pages.iter().filter(|p| p.is_failed())
    }
}

/// Message attached to every successful response.
pub const SUCCESS_MESSAGE: &str = "OCR completed successfully";

/// Outcome of one request, as serialised to callers.
///
/// Serialises as `{ "success": true, "text", "pages", "fileName", "message" }`
/// or `{ "success": false, "error" }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResponse {
    Success {
        text: String,
        pages: usize,
        file_name: String,
    },
    Failure {
        error: String,
    },
}

impl ExtractionResponse {
    pub fn success(output: &ExtractionOutput, file_name: impl Into<String>) -> Self {
        ExtractionResponse::Success {
            text: output.text.clone(),
            pages: output.page_count(),
            file_name: file_name.into(),
        }
    }

    /// A failure carrying only the error's public message.
    pub fn failure(err: &OcrError) -> Self {
        ExtractionResponse::Failure {
            error: err.public_message(),
        }
    }
}

impl Serialize for ExtractionResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ExtractionResponse::Success {
                text,
                pages,
                file_name,
            } => {
                let mut st = serializer.serialize_struct("ExtractionResponse", 5)?;
                st.serialize_field("success", &true)?;
                st.serialize_field("text", text)?;
                st.serialize_field("pages", pages)?;
                st.serialize_field("fileName", file_name)?;
                st.serialize_field("message", SUCCESS_MESSAGE)?;
                st.end()
            }
            ExtractionResponse::Failure { error } => {
                let mut st = serializer.serialize_struct("ExtractionResponse", 2)?;
                st.serialize_field("success", &false)?;
                st.serialize_field("error", error)?;
                st.end()
            }
        }
    }
}
