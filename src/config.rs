//! Configuration for a PDF text extraction.
//!
//! Every runtime knob lives in [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`]. Rendering density, target pixel size and
//! the image-filter chain are deliberately *not* here: they are constants in
//! [`crate::pipeline::render`] and [`crate::pipeline::normalize`] so every
//! deployment produces the same page images for the same PDF.

use crate::error::OcrError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Language hint used when the caller does not supply one.
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Configuration for one or more extractions.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_ocr::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .max_pages(50)
///     .page_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_pages, 50);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Largest page count accepted. Default: 200.
    ///
    /// Checked against the document's page count before any page is
    /// rendered, so an oversized upload costs one parse and nothing more.
    pub max_pages: usize,

    /// Per-page recognition budget in seconds. Default: 120.
    ///
    /// A page that exceeds it is recorded as failed (placeholder text);
    /// the extraction moves on to the next page.
    pub page_timeout_secs: u64,

    /// Pages normalised and recognised at once. Default: 1 (sequential).
    ///
    /// Output order is page order regardless of this value.
    pub page_concurrency: usize,

    /// Parent directory for per-extraction scratch directories.
    /// `None` uses the OS temp directory.
    pub scratch_root: Option<PathBuf>,

    /// Run [`crate::pipeline::postprocess::clean_page_text`] on each page. Default: true.
    pub clean_text: bool,

    /// Language hint used when the request carries none. Default: `"eng"`.
    pub default_language: String,

    /// Optional progress callback for per-page events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_pages: 200,
            page_timeout_secs: 120,
            page_concurrency: 1,
            scratch_root: None,
            clean_text: true,
            default_language: DEFAULT_LANGUAGE.to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("max_pages", &self.max_pages)
            .field("page_timeout_secs", &self.page_timeout_secs)
            .field("page_concurrency", &self.page_concurrency)
            .field("scratch_root", &self.scratch_root)
            .field("clean_text", &self.clean_text)
            .field("default_language", &self.default_language)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Directory under which scratch directories are created.
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n;
        self
    }

    pub fn page_timeout_secs(mut self, secs: u64) -> Self {
        self.config.page_timeout_secs = secs;
        self
    }

    pub fn page_concurrency(mut self, n: usize) -> Self {
        self.config.page_concurrency = n.max(1);
        self
    }

    pub fn scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_root = Some(dir.into());
        self
    }

    pub fn clean_text(mut self, v: bool) -> Self {
        self.config.clean_text = v;
        self
    }

    pub fn default_language(mut self, lang: impl Into<String>) -> Self {
        self.config.default_language = lang.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, OcrError> {
        let c = &self.config;
        if c.max_pages == 0 {
            return Err(OcrError::InvalidConfig("max_pages must be ≥ 1".into()));
        }
        if c.page_timeout_secs == 0 {
            return Err(OcrError::InvalidConfig(
                "page_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.default_language.trim().is_empty() {
            return Err(OcrError::InvalidConfig(
                "default_language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
