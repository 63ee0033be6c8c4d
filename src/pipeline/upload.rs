//! Uploaded-file extraction: turn a submitted file into validated PDF bytes.
//!
//! The HTTP boundary feeds every multipart field through
//! [`UploadCollector`], which enforces "exactly one file, declared as
//! `application/pdf`". The CLI goes through [`UploadedFile::from_path`],
//! which has no declared media type to trust and checks the `%PDF` magic
//! bytes instead.

use crate::error::{OcrError, ValidationError};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The single accepted media type.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Name of the form field carrying the PDF.
pub const FILE_FIELD: &str = "file";

/// Name of the optional form field carrying the language hint.
pub const LANGUAGE_FIELD: &str = "language";

/// A validated upload. Immutable once built.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub bytes: Bytes,
    pub media_type: String,
}

impl UploadedFile {
    /// Validate one submitted file part.
    ///
    /// `content_type` is compared by essence, so `application/pdf;
    /// name=x.pdf` is accepted and `image/png` is not.
    pub fn from_part(
        file_name: Option<&str>,
        content_type: Option<&str>,
        bytes: Bytes,
    ) -> Result<Self, ValidationError> {
        let declared = content_type.unwrap_or("").trim();
        if !is_pdf_media_type(declared) {
            return Err(ValidationError::UnsupportedType {
                found: if declared.is_empty() {
                    "none".to_string()
                } else {
                    declared.to_string()
                },
            });
        }
        if bytes.is_empty() {
            return Err(ValidationError::EmptyFile);
        }

        Ok(Self {
            original_name: file_name.unwrap_or("document.pdf").to_string(),
            bytes,
            media_type: PDF_MEDIA_TYPE.to_string(),
        })
    }

    /// Read a local file, validating existence and PDF magic bytes.
    pub async fn from_path(path: &Path) -> Result<Self, OcrError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => OcrError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => OcrError::Internal(format!("Failed to read {}: {}", path.display(), e)),
        })?;

        if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
            let mut magic = [0u8; 4];
            let n = bytes.len().min(4);
            magic[..n].copy_from_slice(&bytes[..n]);
            return Err(OcrError::NotAPdf {
                path: path.to_path_buf(),
                magic,
            });
        }

        debug!("Resolved local PDF: {}", path.display());
        Ok(Self {
            original_name: file_name_of(path),
            bytes: Bytes::from(bytes),
            media_type: PDF_MEDIA_TYPE.to_string(),
        })
    }
}

/// Accumulates multipart fields and enforces the upload contract.
///
/// Transport-agnostic: the caller reads each field and hands over its name,
/// declared file name/type and content.
#[derive(Debug, Default)]
pub struct UploadCollector {
    file: Option<UploadedFile>,
    language: Option<String>,
    files_seen: usize,
    first_error: Option<ValidationError>,
}

impl UploadCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a field with this name should be read as the file.
    pub fn wants_file(field_name: &str) -> bool {
        field_name == FILE_FIELD
    }

    /// Record the `file` field.
    pub fn push_file(&mut self, file_name: Option<&str>, content_type: Option<&str>, bytes: Bytes) {
        self.files_seen += 1;
        match UploadedFile::from_part(file_name, content_type, bytes) {
            Ok(file) => {
                if self.file.is_none() {
                    self.file = Some(file);
                }
            }
            Err(e) => {
                self.first_error.get_or_insert(e);
            }
        }
    }

    /// Record the `language` field. Blank values mean "use the default".
    pub fn push_language(&mut self, value: &str) {
        let value = value.trim();
        if !value.is_empty() {
            self.language = Some(value.to_string());
        }
    }

    /// Finish collection.
    pub fn finish(self) -> Result<(UploadedFile, Option<String>), ValidationError> {
        if self.files_seen > 1 {
            return Err(ValidationError::MultipleFiles);
        }
        if let Some(err) = self.first_error {
            return Err(err);
        }
        let file = self.file.ok_or(ValidationError::MissingFile)?;
        Ok((file, self.language))
    }
}

fn is_pdf_media_type(declared: &str) -> bool {
    declared
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_MEDIA_TYPE))
        .unwrap_or(false)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| PathBuf::from(path).display().to_string())
}
