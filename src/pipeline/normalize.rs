//! Page image normalisation ahead of OCR.
//!
//! Every rendered page goes through the same fixed chain:
//!
//! 1. resize to 2000 px wide, keeping the aspect ratio, with the height
//!    capped at 4000 px (narrower output for pages taller than 1:2)
//! 2. convert to 8-bit grayscale
//! 3. stretch contrast so the 1st/99th luminance percentiles map to 0/255
//! 4. unsharp mask
//!
//! and comes out PNG-encoded, ready to be piped to the recogniser.
//! Everything here is CPU-bound and synchronous; the orchestrator calls it
//! from `spawn_blocking`.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageFormat, ImageResult};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Width every page is resized to before recognition.
pub const NORMALIZED_WIDTH: u32 = 2000;

/// Height cap for normalised pages. Pages taller than 1:2 are fitted into
/// `NORMALIZED_WIDTH` × `MAX_NORMALIZED_HEIGHT` instead.
pub const MAX_NORMALIZED_HEIGHT: u32 = 4000;

/// Fraction of pixels clipped at each end of the histogram by the contrast stretch.
pub const CLIP_FRACTION: f64 = 0.01;

/// Gaussian sigma of the unsharp mask.
pub const SHARPEN_SIGMA: f32 = 1.0;

/// Minimum brightness difference the unsharp mask acts on.
pub const SHARPEN_THRESHOLD: i32 = 2;

/// Applies the fixed normalisation chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageNormalizer;

impl ImageNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Load `path`, normalise it and return PNG bytes.
    pub fn normalize_file(&self, path: &Path) -> ImageResult<Vec<u8>> {
        let img = image::open(path)?;
        let gray = self.normalize_image(&img);
        debug!(
            "Normalised {} → {}x{} px",
            path.display(),
            gray.width(),
            gray.height()
        );
        encode_png(gray)
    }

    /// Run the chain on an in-memory image.
    pub fn normalize_image(&self, img: &DynamicImage) -> GrayImage {
        let (new_w, new_h) = normalized_size(img.width(), img.height());

        let resized = img.resize_exact(new_w, new_h, FilterType::Lanczos3);
        let gray = stretch_contrast(resized.to_luma8());
        imageops::unsharpen(&gray, SHARPEN_SIGMA, SHARPEN_THRESHOLD)
    }
}

/// Output dimensions for a `width` × `height` page.
///
/// Normally `NORMALIZED_WIDTH` wide with the height scaled to match. When
/// that height would exceed `MAX_NORMALIZED_HEIGHT`, the page is fitted to
/// the height cap instead, so output never exceeds
/// `NORMALIZED_WIDTH × MAX_NORMALIZED_HEIGHT` pixels.
pub fn normalized_size(width: u32, height: u32) -> (u32, u32) {
    let (w, h) = (width.max(1) as u64, height.max(1) as u64);
    let target_w = NORMALIZED_WIDTH as u64;
    let max_h = MAX_NORMALIZED_HEIGHT as u64;

    let scaled_h = (h * target_w + w / 2) / w;
    if scaled_h <= max_h {
        return (NORMALIZED_WIDTH, scaled_h.max(1) as u32);
    }
    let fitted_w = ((w * max_h + h / 2) / h).clamp(1, target_w);
    (fitted_w as u32, MAX_NORMALIZED_HEIGHT)
}

/// Linearly map the `CLIP_FRACTION` / `1 - CLIP_FRACTION` luminance
/// percentiles onto the full 0–255 range.
///
/// A flat image (both percentiles equal) is returned unchanged.
pub fn stretch_contrast(mut img: GrayImage) -> GrayImage {
    let total = img.width() as u64 * img.height() as u64;
    if total == 0 {
        return img;
    }

    let mut histogram = [0u64; 256];
    for p in img.pixels() {
        histogram[p.0[0] as usize] += 1;
    }

    let clip = (total as f64 * CLIP_FRACTION).floor() as u64;
    let low = percentile(&histogram, clip);
    let high = percentile(&histogram, total.saturating_sub(clip + 1));
    if high <= low {
        return img;
    }

    let span = (high - low) as f32;
    let mut lut = [0u8; 256];
    for (v, slot) in lut.iter_mut().enumerate() {
        let scaled = (v as f32 - low as f32) * 255.0 / span;
        *slot = scaled.round().clamp(0.0, 255.0) as u8;
    }

    for p in img.pixels_mut() {
        p.0[0] = lut[p.0[0] as usize];
    }
    img
}

/// Smallest luminance whose cumulative count exceeds `rank`.
fn percentile(histogram: &[u64; 256], rank: u64) -> u8 {
    let mut seen = 0u64;
    for (v, &count) in histogram.iter().enumerate() {
        seen += count;
        if seen > rank {
            return v as u8;
        }
    }
    u8::MAX
}

fn encode_png(img: GrayImage) -> ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    DynamicImage::ImageLuma8(img).write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn low_contrast(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, _| Luma([100 + (x % 50) as u8]))
    }

    #[test]
    fn stretch_expands_to_full_range() {
        let out = stretch_contrast(low_contrast(200, 10));
        let min = out.pixels().map(|p| p.0[0]).min().unwrap();
        let max = out.pixels().map(|p| p.0[0]).max().unwrap();
        assert_eq!(min, 0);
        assert_eq!(max, 255);
    }

    #[test]
    fn flat_image_is_unchanged() {
        let img = GrayImage::from_pixel(20, 20, Luma([77]));
        let out = stretch_contrast(img.clone());
        assert_eq!(out, img);
    }

    #[test]
    fn resize_keeps_aspect_ratio() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1654, 2339, Rgb([250, 250, 250])));
        let out = ImageNormalizer::new().normalize_image(&img);
        assert_eq!(out.width(), NORMALIZED_WIDTH);
        assert_eq!(out.height(), 2828);
    }

    #[test]
    fn small_images_are_upscaled() {
        let img = DynamicImage::ImageLuma8(low_contrast(100, 50));
        let out = ImageNormalizer::new().normalize_image(&img);
        assert_eq!((out.width(), out.height()), (2000, 1000));
    }

    #[test]
    fn narrow_tall_page_is_fitted_to_height_cap() {
        // A 1:100 page rendered into the 1654x2339 box.
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(23, 2339, Luma([40])));
        let out = ImageNormalizer::new().normalize_image(&img);
        assert_eq!((out.width(), out.height()), (39, MAX_NORMALIZED_HEIGHT));
    }

    #[test]
    fn output_size_is_bounded_for_any_geometry() {
        let cap = NORMALIZED_WIDTH as u64 * MAX_NORMALIZED_HEIGHT as u64;
        for (w, h) in [(1, 2339), (23, 2339), (1654, 2339), (1654, 1), (1, 1), (1000, 2001)] {
            let (nw, nh) = normalized_size(w, h);
            assert!(nw >= 1 && nw <= NORMALIZED_WIDTH, "{w}x{h} -> {nw}x{nh}");
            assert!(nh >= 1 && nh <= MAX_NORMALIZED_HEIGHT, "{w}x{h} -> {nw}x{nh}");
            assert!(nw as u64 * nh as u64 <= cap);
        }
        assert_eq!(normalized_size(1000, 2000), (2000, 4000));
        assert_eq!(normalized_size(1000, 2001), (1999, 4000));
        assert_eq!(normalized_size(1654, 1), (2000, 1));
    }

    #[test]
    fn normalize_file_emits_grayscale_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.1.png");
        RgbImage::from_fn(400, 300, |x, y| Rgb([(x % 255) as u8, (y % 255) as u8, 90]))
            .save(&path)
            .unwrap();

        let png = ImageNormalizer::new().normalize_file(&path).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&png).unwrap();
        assert!(matches!(decoded, DynamicImage::ImageLuma8(_)));
        assert_eq!((decoded.width(), decoded.height()), (2000, 1500));
    }

    #[test]
    fn undecodable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.1.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(ImageNormalizer::new().normalize_file(&path).is_err());
    }
}
