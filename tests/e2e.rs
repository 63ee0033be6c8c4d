//! End-to-end tests against a real pdfium library and a real tesseract binary.
//!
//! Gated behind the `E2E_ENABLED` environment variable so they do not run in
//! CI unless explicitly requested. The PDFs are generated here; tests that
//! use `./test_cases/sample.pdf` also skip when that file is missing.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=. cargo test --test e2e -- --nocapture
//!
//! To restrict to a specific test:
//!   E2E_ENABLED=1 cargo test --test e2e test_rasterize -- --nocapture

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use bytes::Bytes;
use pdf_ocr::pipeline::render::{page_file_name, TARGET_HEIGHT, TARGET_WIDTH};
use pdf_ocr::{
    router, ExtractionConfig, Extractor, LanguageHint, OcrError, PageRasterizer,
    PdfiumRasterizer, PAGE_PLACEHOLDER,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        e2e_skip_unless_enabled!();
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Build a valid PDF with one A4 page per entry of `lines`, each page
/// showing its line in large Helvetica.
fn pdf_with_pages(lines: &[&str]) -> Vec<u8> {
    let n = lines.len();
    // Object numbers: 1 catalog, 2 pages, 3 font, then (page, content) pairs.
    let page_obj = |i: usize| 4 + 2 * i;
    let content_obj = |i: usize| 5 + 2 * i;

    let mut objects: Vec<String> = Vec::new();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", page_obj(i))).collect();
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        n
    ));
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());
    for (i, line) in lines.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            content_obj(i)
        ));
        let stream = format!("BT /F1 36 Tf 72 700 Td ({}) Tj ET", line);
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for off in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    out
}

fn real_extractor(config: ExtractionConfig) -> Extractor {
    Extractor::from_env(config)
}

// ── Rasterisation (pdfium only) ──────────────────────────────────────────────

#[test]
fn test_rasterize_generated_pdf() {
    e2e_skip_unless_enabled!();
    let pdf = pdf_with_pages(&["FIRST PAGE", "SECOND PAGE"]);
    let out = tempfile::tempdir().unwrap();

    let images = PdfiumRasterizer::from_env()
        .rasterize(&pdf, out.path(), 10)
        .expect("rasterize should succeed");

    assert_eq!(images.len(), 2);
    for (i, img) in images.iter().enumerate() {
        assert_eq!(img.page_num, i + 1);
        assert_eq!(img.path, out.path().join(page_file_name(i + 1)));
        let decoded = image::open(&img.path).unwrap();
        assert!(decoded.width() <= TARGET_WIDTH);
        assert!(decoded.height() <= TARGET_HEIGHT);
        assert!(decoded.width() > TARGET_WIDTH - 10, "width {}", decoded.width());
        println!("page {} → {}x{}", img.page_num, decoded.width(), decoded.height());
    }
}

#[test]
fn test_rasterize_rejects_garbage() {
    e2e_skip_unless_enabled!();
    let out = tempfile::tempdir().unwrap();

    let err = PdfiumRasterizer::from_env()
        .rasterize(b"%PDF-1.4\nthis is not really a pdf", out.path(), 10)
        .unwrap_err();

    assert!(matches!(err, OcrError::Rasterization { .. }), "got {err:?}");
}

#[test]
fn test_rasterize_page_limit_before_rendering() {
    e2e_skip_unless_enabled!();
    let pdf = pdf_with_pages(&["ONE", "TWO", "THREE"]);
    let out = tempfile::tempdir().unwrap();

    let err = PdfiumRasterizer::from_env()
        .rasterize(&pdf, out.path(), 2)
        .unwrap_err();

    assert!(matches!(err, OcrError::PageLimitExceeded { pages: 3, max: 2 }));
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

// ── Full pipeline (pdfium + tesseract) ───────────────────────────────────────

#[tokio::test]
async fn test_extract_generated_pdf() {
    e2e_skip_unless_enabled!();
    let root = tempfile::tempdir().unwrap();
    let config = ExtractionConfig::builder()
        .scratch_root(root.path())
        .build()
        .unwrap();
    let pdf = pdf_with_pages(&["HELLO WORLD", "RUST OCR"]);

    let out = real_extractor(config)
        .extract(Bytes::from(pdf), &LanguageHint::default())
        .await
        .expect("extraction should succeed");

    println!("{}", out.text);
    assert_eq!(out.page_count(), 2);
    assert_eq!(out.stats.failed_pages, 0, "{:?}", out.pages);
    assert!(out.text.starts_with("--- Page 1 ---\n"));
    assert!(out.text.contains("--- Page 2 ---\n"));
    assert!(out.pages[0].text.to_uppercase().contains("HELLO"));
    assert!(out.pages[1].text.to_uppercase().contains("RUST"));
    assert!(!out.text.contains(PAGE_PLACEHOLDER));
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_unknown_language_fails_pages_not_request() {
    e2e_skip_unless_enabled!();
    let root = tempfile::tempdir().unwrap();
    let config = ExtractionConfig::builder()
        .scratch_root(root.path())
        .build()
        .unwrap();
    let pdf = pdf_with_pages(&["HELLO"]);

    let out = real_extractor(config)
        .extract(Bytes::from(pdf), &LanguageHint::new("zzz_no_such_lang"))
        .await
        .expect("missing traineddata is a page failure");

    assert_eq!(out.page_count(), 1);
    assert_eq!(out.stats.failed_pages, 1);
    assert_eq!(out.text, format!("--- Page 1 ---\n{}\n\n", PAGE_PLACEHOLDER));
}

#[tokio::test]
async fn test_extract_sample_file() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));
    let extractor = real_extractor(ExtractionConfig::builder().page_concurrency(2).build().unwrap());

    let out = extractor
        .extract_file(&path, &LanguageHint::default())
        .await
        .expect("extract_file should succeed");

    println!(
        "sample.pdf: {} pages, {} failed, {}ms",
        out.page_count(),
        out.stats.failed_pages,
        out.stats.total_duration_ms
    );
    assert!(out.page_count() >= 1);
    let headers = out.text.matches("--- Page ").count();
    assert_eq!(headers, out.page_count());
}

#[tokio::test]
async fn test_http_upload_generated_pdf() {
    e2e_skip_unless_enabled!();
    let root = tempfile::tempdir().unwrap();
    let config = ExtractionConfig::builder()
        .scratch_root(root.path())
        .build()
        .unwrap();
    let app = router(Arc::new(real_extractor(config)), 10 * 1024 * 1024);

    let pdf = pdf_with_pages(&["INVOICE 42"]);
    let boundary = "e2e-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"invoice.pdf\"\r\n\
         Content-Type: application/pdf\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(&pdf);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let req = Request::builder()
        .method("POST")
        .uri("/api/extract-text")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    println!("{json:#}");
    assert_eq!(json["success"], true);
    assert_eq!(json["pages"], 1);
    assert_eq!(json["fileName"], "invoice.pdf");
    assert!(json["text"].as_str().unwrap().contains("INVOICE"));
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}
