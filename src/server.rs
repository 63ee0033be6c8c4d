//! HTTP boundary for the extraction service.
//!
//! Endpoints:
//! - `POST /api/extract-text`: multipart upload (`file` + optional `language`),
//!   returns an [`ExtractionResponse`]
//! - `GET /api/extract-text`: static usage documentation
//! - `GET /health`: liveness and version

use crate::error::{OcrError, ValidationError};
use crate::extract::Extractor;
use crate::output::ExtractionResponse;
use crate::pipeline::recognize::SUPPORTED_LANGUAGES;
use crate::pipeline::upload::{UploadCollector, UploadedFile, LANGUAGE_FIELD};
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Path of the extraction endpoint.
pub const EXTRACT_TEXT_PATH: &str = "/api/extract-text";

/// Default request body cap for uploads: 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Application state
pub struct AppState {
    pub extractor: Arc<Extractor>,
    pub start_time: Instant,
}

/// Build the API router
pub fn router(extractor: Arc<Extractor>, max_upload_bytes: usize) -> Router {
    let state = Arc::new(AppState {
        extractor,
        start_time: Instant::now(),
    });

    Router::new()
        .route("/health", get(health_handler))
        .route(EXTRACT_TEXT_PATH, get(usage_handler))
        .route(
            EXTRACT_TEXT_PATH,
            post(extract_text_handler).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Errors ===

/// An [`OcrError`] on its way out as a JSON failure response.
#[derive(Debug)]
pub struct ApiError(pub OcrError);

impl From<OcrError> for ApiError {
    fn from(e: OcrError) -> Self {
        ApiError(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError(OcrError::Validation(e))
    }
}

/// HTTP status for an error.
pub fn status_for(err: &OcrError) -> StatusCode {
    match err {
        OcrError::Validation(ValidationError::UnsupportedType { .. }) => {
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        }
        OcrError::Validation(ValidationError::TooLarge) | OcrError::PageLimitExceeded { .. } => {
            StatusCode::PAYLOAD_TOO_LARGE
        }
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if self.0.is_client_error() {
            warn!("Rejected upload: {}", self.0);
        } else {
            error!("OCR processing failed: {}", self.0);
        }
        (status, Json(ExtractionResponse::failure(&self.0))).into_response()
    }
}

// === Extraction ===

async fn extract_text_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractionResponse>, ApiError> {
    let multipart = multipart.map_err(|e| ValidationError::Multipart(e.body_text()))?;
    let (file, language) = read_upload(multipart).await?;
    let language = state.extractor.language_or_default(language.as_deref());

    info!(
        "Starting OCR for '{}' ({} bytes, language '{}')",
        file.original_name,
        file.bytes.len(),
        language
    );
    let output = state.extractor.extract_upload(&file, &language).await?;

    Ok(Json(ExtractionResponse::success(&output, file.original_name)))
}

/// Drain the multipart body into a validated upload and optional language.
async fn read_upload(
    mut multipart: Multipart,
) -> Result<(UploadedFile, Option<String>), ValidationError> {
    let mut collector = UploadCollector::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();

        if UploadCollector::wants_file(&name) {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await.map_err(multipart_error)?;
            collector.push_file(file_name.as_deref(), content_type.as_deref(), data);
        } else if name == LANGUAGE_FIELD {
            let value = field.text().await.map_err(multipart_error)?;
            collector.push_language(&value);
        }
    }

    collector.finish()
}

fn multipart_error(e: MultipartError) -> ValidationError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::TooLarge
    } else {
        ValidationError::Multipart(e.body_text())
    }
}

// === Usage ===

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UsageResponse {
    message: &'static str,
    instructions: &'static str,
    example: UsageExample,
    supported_languages: &'static [&'static str],
}

#[derive(Serialize)]
struct UsageExample {
    method: &'static str,
    url: &'static str,
    body: &'static str,
}

async fn usage_handler() -> Json<UsageResponse> {
    Json(UsageResponse {
        message: "Use POST method with a PDF file to extract text",
        instructions: "Send multipart/form-data with a \"file\" field holding the PDF \
                       and an optional \"language\" field (default \"eng\")",
        example: UsageExample {
            method: "POST",
            url: EXTRACT_TEXT_PATH,
            body: "multipart/form-data with \"file\" (PDF) and optional \"language\" fields",
        },
        supported_languages: SUPPORTED_LANGUAGES,
    })
}

// === Health ===

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
