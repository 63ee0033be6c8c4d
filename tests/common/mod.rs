//! Fake adapters shared by the integration tests.
//!
//! The fake rasteriser writes real PNG files whose flat gray level encodes
//! the page number (`page * 20`). Normalisation keeps a flat image flat, so
//! the fake recogniser can read the page number back from the PNG it is
//! handed and answer with page-specific text.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{GenericImageView, GrayImage, Luma};
use pdf_ocr::error::{OcrError, RecognitionError};
use pdf_ocr::pipeline::render::page_file_name;
use pdf_ocr::{LanguageHint, PageImage, PageRasterizer, TextRecognizer};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Gray level the fake rasteriser paints page `n` with.
pub fn page_level(page_num: usize) -> u8 {
    (page_num * 20) as u8
}

/// Rasteriser producing `pages` flat PNGs.
#[derive(Default)]
pub struct FakeRasterizer {
    pub pages: usize,
    /// Fail the whole document with this detail.
    pub fail_with: Option<String>,
    /// Write undecodable bytes for these pages.
    pub corrupt_pages: HashSet<usize>,
    /// Render these pages as a 4x800 sliver instead of 40x20.
    pub tall_pages: HashSet<usize>,
    /// Every scratch directory this rasteriser was handed.
    pub dirs_seen: Mutex<Vec<PathBuf>>,
}

impl FakeRasterizer {
    pub fn with_pages(pages: usize) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    pub fn dirs_seen(&self) -> Vec<PathBuf> {
        self.dirs_seen.lock().unwrap().clone()
    }
}

impl PageRasterizer for FakeRasterizer {
    fn rasterize(
        &self,
        _pdf: &[u8],
        out_dir: &Path,
        max_pages: usize,
    ) -> Result<Vec<PageImage>, OcrError> {
        self.dirs_seen.lock().unwrap().push(out_dir.to_path_buf());
        assert!(out_dir.is_dir(), "scratch dir must exist before rendering");

        if let Some(ref detail) = self.fail_with {
            return Err(OcrError::Rasterization {
                detail: detail.clone(),
            });
        }
        if self.pages > max_pages {
            return Err(OcrError::PageLimitExceeded {
                pages: self.pages,
                max: max_pages,
            });
        }

        let mut images = Vec::with_capacity(self.pages);
        for n in 1..=self.pages {
            let path = out_dir.join(page_file_name(n));
            if self.corrupt_pages.contains(&n) {
                std::fs::write(&path, b"definitely not a png").unwrap();
            } else if self.tall_pages.contains(&n) {
                GrayImage::from_pixel(4, 800, Luma([page_level(n)]))
                    .save(&path)
                    .unwrap();
            } else {
                GrayImage::from_pixel(40, 20, Luma([page_level(n)]))
                    .save(&path)
                    .unwrap();
            }
            images.push(PageImage { page_num: n, path });
        }
        Ok(images)
    }
}

/// Recogniser answering `Text of page N` for the page encoded in the image.
#[derive(Default)]
pub struct FakeRecognizer {
    pub fail_pages: HashSet<usize>,
    pub delays: HashMap<usize, Duration>,
    /// Raw text returned for every page instead of the default, if set.
    pub raw_text: Option<String>,
    pub languages_seen: Mutex<Vec<String>>,
    pub calls: Mutex<Vec<usize>>,
    /// (page, width, height) of every image handed over.
    pub sizes_seen: Mutex<Vec<(usize, u32, u32)>>,
}

impl FakeRecognizer {
    pub fn failing_on(pages: &[usize]) -> Self {
        Self {
            fail_pages: pages.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

/// Page number encoded in a normalised PNG.
pub fn decode_page(png: &[u8]) -> usize {
    let img = image::load_from_memory(png).unwrap().to_luma8();
    let level = img.get_pixel(img.width() / 2, img.height() / 2).0[0] as f64;
    (level / 20.0).round() as usize
}

#[async_trait]
impl TextRecognizer for FakeRecognizer {
    async fn recognize(
        &self,
        image_png: Vec<u8>,
        language: &LanguageHint,
    ) -> Result<String, RecognitionError> {
        let page = decode_page(&image_png);
        let (w, h) = image::load_from_memory(&image_png).unwrap().dimensions();
        self.calls.lock().unwrap().push(page);
        self.sizes_seen.lock().unwrap().push((page, w, h));
        self.languages_seen
            .lock()
            .unwrap()
            .push(language.as_str().to_string());

        if let Some(delay) = self.delays.get(&page) {
            tokio::time::sleep(*delay).await;
        }
        if self.fail_pages.contains(&page) {
            return Err(RecognitionError::Failed(format!("engine crashed on page {page}")));
        }
        Ok(match self.raw_text {
            Some(ref raw) => raw.clone(),
            None => format!("  Text of page {page}  \n"),
        })
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Number of entries in `dir`.
pub fn entry_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

/// Smallest thing that passes as a PDF upload.
pub const PDF_STUB: &[u8] = b"%PDF-1.4\n%%EOF\n";
