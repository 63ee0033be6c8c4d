//! PDF rasterisation: render every page of a PDF to a PNG in the scratch dir.
//!
//! Rendering goes through the [`PageRasterizer`] trait so the orchestrator
//! can be driven by a fake in tests. The production implementation,
//! [`PdfiumRasterizer`], wraps pdfium, which keeps thread-local state and
//! blocks for the whole render, so [`rasterize`] always runs it inside
//! `tokio::task::spawn_blocking`.
//!
//! Output geometry is fixed: pages are rendered to a 1654 px wide target
//! (A4 at 200 DPI, the size produced by a 300 DPI render scaled into the
//! 1654×2339 box), with the height capped at 2339 px. Files are named
//! `page.<n>.png`, 1-indexed.

use crate::error::OcrError;
use crate::output::PageImage;
use bytes::Bytes;
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Nominal render density in dots per inch.
pub const RENDER_DENSITY: u32 = 300;

/// Width every page is rendered to, in pixels.
pub const TARGET_WIDTH: u32 = 1654;

/// Height cap for rendered pages, in pixels.
pub const TARGET_HEIGHT: u32 = 2339;

/// Environment variable naming the directory that holds libpdfium.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Turns a PDF into one image file per page.
///
/// Implementations are blocking; callers go through [`rasterize`].
pub trait PageRasterizer: Send + Sync {
    /// Render every page of `pdf` into `out_dir`.
    ///
    /// Must fail with [`OcrError::PageLimitExceeded`] before rendering
    /// anything when the document has more than `max_pages` pages, and
    /// return images in page order.
    fn rasterize(
        &self,
        pdf: &[u8],
        out_dir: &Path,
        max_pages: usize,
    ) -> Result<Vec<PageImage>, OcrError>;
}

/// Run a rasteriser on the blocking pool.
pub async fn rasterize(
    rasterizer: Arc<dyn PageRasterizer>,
    pdf: Bytes,
    out_dir: PathBuf,
    max_pages: usize,
) -> Result<Vec<PageImage>, OcrError> {
    tokio::task::spawn_blocking(move || rasterizer.rasterize(&pdf, &out_dir, max_pages))
        .await
        .map_err(|e| OcrError::Internal(format!("Render task panicked: {}", e)))?
}

/// File name for a rendered page.
pub fn page_file_name(page_num: usize) -> String {
    format!("page.{}.png", page_num)
}

/// pdfium-backed rasteriser.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    lib_dir: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// Look for libpdfium in `lib_dir` first, then the system library path.
    pub fn new(lib_dir: Option<PathBuf>) -> Self {
        Self { lib_dir }
    }

    /// Use `PDFIUM_LIB_PATH` when set.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var_os(PDFIUM_LIB_PATH_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        )
    }

    /// Check that pdfium can be loaded at all.
    pub fn check_binding(&self) -> Result<(), OcrError> {
        bind_pdfium(self.lib_dir.as_deref()).map(|_| ())
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(
        &self,
        pdf: &[u8],
        out_dir: &Path,
        max_pages: usize,
    ) -> Result<Vec<PageImage>, OcrError> {
        let pdfium = bind_pdfium(self.lib_dir.as_deref())?;

        let document =
            pdfium
                .load_pdf_from_byte_slice(pdf, None)
                .map_err(|e| OcrError::Rasterization {
                    detail: format!("{:?}", e),
                })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        if total_pages > max_pages {
            return Err(OcrError::PageLimitExceeded {
                pages: total_pages,
                max: max_pages,
            });
        }

        let render_config = PdfRenderConfig::new()
            .set_target_width(TARGET_WIDTH as i32)
            .set_maximum_height(TARGET_HEIGHT as i32);

        let mut images = Vec::with_capacity(total_pages);
        for idx in 0..total_pages {
            let page_num = idx + 1;
            let page = pages
                .get(idx as u16)
                .map_err(|e| OcrError::Rasterization {
                    detail: format!("page {}: {:?}", page_num, e),
                })?;

            let bitmap =
                page.render_with_config(&render_config)
                    .map_err(|e| OcrError::Rasterization {
                        detail: format!("page {}: {:?}", page_num, e),
                    })?;

            let image = bitmap.as_image();
            let path = out_dir.join(page_file_name(page_num));
            image
                .save_with_format(&path, ImageFormat::Png)
                .map_err(|e| OcrError::Rasterization {
                    detail: format!("page {}: {}", page_num, e),
                })?;

            debug!(
                "Rendered page {} → {}x{} px at nominal {} DPI",
                page_num,
                image.width(),
                image.height(),
                RENDER_DENSITY
            );
            images.push(PageImage { page_num, path });
        }

        Ok(images)
    }
}

/// Bind to libpdfium, preferring an explicit directory.
///
/// Never panics: a missing library becomes [`OcrError::PdfiumBindingFailed`].
pub fn bind_pdfium(lib_dir: Option<&Path>) -> Result<Pdfium, OcrError> {
    let bindings = match lib_dir {
        Some(dir) => {
            let dir = dir.to_string_lossy().into_owned();
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
                .or_else(|_| Pdfium::bind_to_system_library())
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| OcrError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}
