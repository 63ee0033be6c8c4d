//! The extraction orchestrator.
//!
//! [`Extractor::extract`] drives one document through the pipeline:
//!
//! ```text
//! scratch dir ──▶ rasterise ──▶ for each page, in order:
//!                                 normalise ──▶ recognise ──▶ clean
//!             ──▶ assemble ──▶ remove scratch dir
//! ```
//!
//! Only setup failures are fatal: no scratch directory, a document that
//! cannot be rasterised, too many pages, or zero pages. A page that fails
//! to normalise, fails to recognise or runs past its time budget becomes a
//! [`PageResult`] carrying a [`PageError`], and its segment of the text is
//! the placeholder. The number of page results always equals the number of
//! rasterised pages.

use crate::config::ExtractionConfig;
use crate::error::{OcrError, PageError};
use crate::output::{ExtractionOutput, ExtractionStats, PageImage, PageResult};
use crate::pipeline::normalize::ImageNormalizer;
use crate::pipeline::postprocess::clean_page_text;
use crate::pipeline::recognize::{LanguageHint, TesseractCli, TextRecognizer};
use crate::pipeline::render::{self, PageRasterizer, PdfiumRasterizer};
use crate::pipeline::scratch::ScratchDir;
use crate::pipeline::upload::UploadedFile;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Header line that opens each page's segment, e.g. `--- Page 3 ---`.
pub fn page_header(page_num: usize) -> String {
    format!("--- Page {} ---", page_num)
}

/// Join page segments in page order.
///
/// Each page contributes `--- Page N ---\n{segment}\n\n`, where the segment
/// is the recognised text or, for a failed page, the placeholder.
pub fn assemble_text(pages: &[PageResult]) -> String {
    let mut text = String::with_capacity(pages.iter().map(|p| p.segment().len() + 24).sum());
    for page in pages {
        text.push_str(&page_header(page.page_num));
        text.push('\n');
        text.push_str(page.segment());
        text.push_str("\n\n");
    }
    text
}

/// Runs extractions. Cheap to share behind an `Arc`; holds no per-call state.
pub struct Extractor {
    rasterizer: Arc<dyn PageRasterizer>,
    normalizer: ImageNormalizer,
    recognizer: Arc<dyn TextRecognizer>,
    config: ExtractionConfig,
}

impl Extractor {
    pub fn new(
        rasterizer: Arc<dyn PageRasterizer>,
        recognizer: Arc<dyn TextRecognizer>,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            rasterizer,
            normalizer: ImageNormalizer::new(),
            recognizer,
            config,
        }
    }

    /// pdfium + tesseract, located through `PDFIUM_LIB_PATH` / `TESSERACT_CMD`.
    pub fn from_env(config: ExtractionConfig) -> Self {
        Self::new(
            Arc::new(PdfiumRasterizer::from_env()),
            Arc::new(TesseractCli::from_env()),
            config,
        )
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// The request's language hint, or the configured default.
    pub fn language_or_default(&self, requested: Option<&str>) -> LanguageHint {
        match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(lang) => LanguageHint::new(lang),
            None => LanguageHint::new(self.config.default_language.clone()),
        }
    }

    /// Extract the text of every page of `pdf`.
    ///
    /// # Returns
    /// `Ok(ExtractionOutput)` whenever the document could be rasterised,
    /// even if every page failed recognition (check `output.stats.failed_pages`).
    ///
    /// # Errors
    /// Returns `Err(OcrError)` only for fatal errors:
    /// - The scratch directory could not be created
    /// - The document could not be rasterised
    /// - The document exceeds `max_pages`
    /// - Rasterisation produced zero pages
    ///
    /// The scratch directory is removed before this returns, whatever the
    /// outcome, and also when the returned future is dropped mid-flight.
    pub async fn extract(
        &self,
        pdf: Bytes,
        language: &LanguageHint,
    ) -> Result<ExtractionOutput, OcrError> {
        let total_start = Instant::now();
        info!(
            "Starting extraction: {} bytes, language '{}', engine {}",
            pdf.len(),
            language,
            self.recognizer.name()
        );

        let scratch = ScratchDir::create_in(&self.config.scratch_root())?;
        let result = self.run(pdf, language, scratch.path(), total_start).await;
        scratch.cleanup();

        match &result {
            Ok(out) => info!(
                "Extraction complete: {}/{} pages, {}ms total",
                out.stats.succeeded_pages, out.stats.total_pages, out.stats.total_duration_ms
            ),
            Err(e) => warn!("Extraction failed: {}", e),
        }
        result
    }

    /// Extract an uploaded file.
    pub async fn extract_upload(
        &self,
        file: &UploadedFile,
        language: &LanguageHint,
    ) -> Result<ExtractionOutput, OcrError> {
        debug!("Extracting upload '{}'", file.original_name);
        self.extract(file.bytes.clone(), language).await
    }

    /// Read a local PDF and extract it.
    pub async fn extract_file(
        &self,
        path: &Path,
        language: &LanguageHint,
    ) -> Result<ExtractionOutput, OcrError> {
        let file = UploadedFile::from_path(path).await?;
        self.extract_upload(&file, language).await
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    async fn run(
        &self,
        pdf: Bytes,
        language: &LanguageHint,
        scratch: &Path,
        total_start: Instant,
    ) -> Result<ExtractionOutput, OcrError> {
        let cb = self.config.progress_callback.as_ref();

        // ── Step 1: Rasterise ────────────────────────────────────────────
        if let Some(cb) = cb {
            cb.on_rasterize_start();
        }
        let render_start = Instant::now();
        let mut images = render::rasterize(
            Arc::clone(&self.rasterizer),
            pdf,
            scratch.to_path_buf(),
            self.config.max_pages,
        )
        .await?;
        let render_duration_ms = render_start.elapsed().as_millis() as u64;

        if images.is_empty() {
            return Err(OcrError::NoPages);
        }
        images.sort_by_key(|p| p.page_num);
        let total_pages = images.len();
        info!(
            "Rasterised {} pages in {}ms",
            total_pages, render_duration_ms
        );

        if let Some(cb) = cb {
            cb.on_extraction_start(total_pages);
        }

        // ── Step 2: Normalise + recognise each page ──────────────────────
        let ocr_start = Instant::now();
        let pages: Vec<PageResult> = stream::iter(
            images
                .into_iter()
                .map(|image| self.process_page(image, language, total_pages)),
        )
        .buffered(self.config.page_concurrency)
        .collect()
        .await;
        let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;

        // ── Step 3: Assemble ─────────────────────────────────────────────
        let text = assemble_text(&pages);
        let failed = pages.iter().filter(|p| p.is_failed()).count();
        let succeeded = total_pages - failed;

        if let Some(cb) = cb {
            cb.on_extraction_complete(total_pages, succeeded);
        }

        let stats = ExtractionStats {
            total_pages,
            succeeded_pages: succeeded,
            failed_pages: failed,
            render_duration_ms,
            ocr_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        Ok(ExtractionOutput { text, pages, stats })
    }

    /// Process one page. Never fails: errors become a failed [`PageResult`].
    async fn process_page(
        &self,
        image: PageImage,
        language: &LanguageHint,
        total_pages: usize,
    ) -> PageResult {
        let page_num = image.page_num;
        let start = Instant::now();
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_page_start(page_num, total_pages);
        }

        let secs = self.config.page_timeout_secs;
        let outcome = match tokio::time::timeout(
            Duration::from_secs(secs),
            self.recognize_page(&image, language),
        )
        .await
        {
            Ok(r) => r,
            Err(_) => Err(PageError::Timeout {
                page: page_num,
                secs,
            }),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(text) => {
                debug!("Page {} → {} chars in {}ms", page_num, text.len(), duration_ms);
                PageResult::ok(page_num, text, duration_ms)
            }
            Err(e) => {
                warn!("{}", e);
                PageResult::failed(page_num, e, duration_ms)
            }
        };

        if let Some(ref cb) = self.config.progress_callback {
            match &result.error {
                None => cb.on_page_complete(page_num, total_pages, result.text.len()),
                Some(e) => cb.on_page_error(page_num, total_pages, &e.to_string()),
            }
        }
        result
    }

    async fn recognize_page(
        &self,
        image: &PageImage,
        language: &LanguageHint,
    ) -> Result<String, PageError> {
        let page = image.page_num;
        let normalizer = self.normalizer;
        let path = image.path.clone();

        let png = tokio::task::spawn_blocking(move || normalizer.normalize_file(&path))
            .await
            .map_err(|e| PageError::ImageProcessing {
                page,
                detail: format!("normalise task panicked: {}", e),
            })?
            .map_err(|e| PageError::ImageProcessing {
                page,
                detail: e.to_string(),
            })?;

        let raw = self
            .recognizer
            .recognize(png, language)
            .await
            .map_err(|e| PageError::Recognition {
                page,
                detail: e.to_string(),
            })?;

        Ok(if self.config.clean_text {
            clean_page_text(&raw)
        } else {
            raw.trim().to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::PAGE_PLACEHOLDER;

    #[test]
    fn header_is_one_indexed_text() {
        assert_eq!(page_header(1), "--- Page 1 ---");
    }

    #[test]
    fn assemble_maps_failures_to_placeholder() {
        let pages = vec![
            PageResult::ok(1, "first".into(), 0),
            PageResult::failed(
                2,
                PageError::Recognition {
                    page: 2,
                    detail: "boom".into(),
                },
                0,
            ),
            PageResult::ok(3, String::new(), 0),
        ];
        let text = assemble_text(&pages);
        assert_eq!(
            text,
            format!(
                "--- Page 1 ---\nfirst\n\n--- Page 2 ---\n{}\n\n--- Page 3 ---\n\n\n",
                PAGE_PLACEHOLDER
            )
        );
    }

    #[test]
    fn assemble_empty_is_empty() {
        assert_eq!(assemble_text(&[]), "");
    }
}
