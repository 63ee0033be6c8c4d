//! Text recognition: hand a normalised page image to an OCR engine.
//!
//! The engine sits behind the async [`TextRecognizer`] trait. The bundled
//! implementation, [`TesseractCli`], drives the `tesseract` binary: one
//! process per page, fed the PNG on stdin and read back from stdout. The
//! process is the engine instance. It is started for the page, waited on,
//! and killed if the future is dropped first (`kill_on_drop`), so it never
//! outlives the page on any exit path.

use crate::config::DEFAULT_LANGUAGE;
use crate::error::RecognitionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Environment variable overriding the tesseract executable.
pub const TESSERACT_CMD_ENV: &str = "TESSERACT_CMD";

/// Opaque language token forwarded to the engine, e.g. `eng` or `eng+hin`.
///
/// Not interpreted here; an unknown token surfaces as
/// [`RecognitionError::EngineInit`] from the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageHint(String);

impl LanguageHint {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LanguageHint {
    fn default() -> Self {
        Self(DEFAULT_LANGUAGE.to_string())
    }
}

impl fmt::Display for LanguageHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LanguageHint {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for LanguageHint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Language tokens advertised by the usage endpoint.
pub const SUPPORTED_LANGUAGES: &[&str] = &["eng", "hin", "eng+hin", "spa", "fra", "deu"];

/// An OCR engine.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognise the text in one PNG-encoded image.
    ///
    /// Returns the text trimmed of surrounding whitespace.
    async fn recognize(
        &self,
        image_png: Vec<u8>,
        language: &LanguageHint,
    ) -> Result<String, RecognitionError>;

    /// Engine name for logs.
    fn name(&self) -> &str;
}

/// Recogniser that shells out to the `tesseract` binary.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    program: PathBuf,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TesseractCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Use `TESSERACT_CMD` when set, else `tesseract` from `PATH`.
    pub fn from_env() -> Self {
        match std::env::var_os(TESSERACT_CMD_ENV).filter(|v| !v.is_empty()) {
            Some(cmd) => Self::new(cmd),
            None => Self::default(),
        }
    }

    /// Arguments for one recognition: read stdin, write stdout.
    pub fn args(language: &LanguageHint) -> Vec<String> {
        vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            language.as_str().to_string(),
        ]
    }
}

#[async_trait]
impl TextRecognizer for TesseractCli {
    async fn recognize(
        &self,
        image_png: Vec<u8>,
        language: &LanguageHint,
    ) -> Result<String, RecognitionError> {
        let mut child = Command::new(&self.program)
            .args(Self::args(language))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RecognitionError::EngineInit {
                language: language.to_string(),
                detail: format!("cannot start {}: {}", self.program.display(), e),
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RecognitionError::Failed("engine stdin unavailable".into()))?;
        let feed = async move {
            let res = stdin.write_all(&image_png).await;
            drop(stdin);
            res
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(language, output.status.code(), &stderr));
        }
        if let Err(e) = fed {
            warn!("tesseract exited before consuming its input: {}", e);
        }

        let text = parse_output(&output.stdout);
        debug!("tesseract [{}] → {} chars", language, text.len());
        Ok(text)
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

/// Recognised text from engine stdout, trimmed.
fn parse_output(stdout: &[u8]) -> String {
    String::from_utf8_lossy(stdout).trim().to_string()
}

/// Map a failed tesseract run to the matching error kind.
fn classify_failure(language: &LanguageHint, code: Option<i32>, stderr: &str) -> RecognitionError {
    let detail = stderr.trim().to_string();
    let init_failed = detail.contains("Failed loading language")
        || detail.contains("Error opening data file")
        || detail.contains("Could not initialize tesseract");

    if init_failed {
        RecognitionError::EngineInit {
            language: language.to_string(),
            detail,
        }
    } else {
        RecognitionError::Failed(format!(
            "tesseract exited with {}: {}",
            code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
            detail
        ))
    }
}
