//! Per-extraction scratch directory.
//!
//! Every extraction gets its own uniquely named directory under the
//! configured scratch root. The [`ScratchDir`] guard removes it, and every
//! file in it, when dropped: on success, on failure, and when the request
//! future is cancelled mid-flight.

use crate::error::OcrError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Prefix of every scratch directory name.
pub const SCRATCH_PREFIX: &str = "pdf-ocr-";

/// Owns one scratch directory for the lifetime of an extraction.
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchDir {
    /// Create a fresh, uniquely named directory under `root`.
    pub fn create_in(root: &Path) -> Result<Self, OcrError> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(root)
            .map_err(|source| OcrError::Scratch {
                root: root.to_path_buf(),
                source,
            })?;
        let path = dir.path().to_path_buf();
        debug!("Created scratch dir {}", path.display());
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory now and report what happened.
    ///
    /// Removal failures are logged, never returned: the text has already
    /// been produced and a stray directory must not turn it into an error.
    pub fn cleanup(mut self) -> bool {
        self.remove()
    }

    fn remove(&mut self) -> bool {
        let Some(dir) = self.dir.take() else {
            return true;
        };
        match dir.close() {
            Ok(()) => {
                debug!("Removed scratch dir {}", self.path.display());
                true
            }
            Err(e) => {
                warn!(
                    "Failed to remove scratch dir {}: {}",
                    self.path.display(),
                    e
                );
                false
            }
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn drop_removes_directory_and_contents() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let scratch = ScratchDir::create_in(root.path()).unwrap();
            std::fs::write(scratch.path().join("page.1.png"), b"x").unwrap();
            std::fs::write(scratch.path().join("page.2.png"), b"y").unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn explicit_cleanup_reports_success() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create_in(root.path()).unwrap();
        let path = scratch.path().to_path_buf();
        assert!(scratch.cleanup());
        assert!(!path.exists());
    }

    #[test]
    fn names_are_unique_and_prefixed() {
        let root = tempfile::tempdir().unwrap();
        let a = ScratchDir::create_in(root.path()).unwrap();
        let b = ScratchDir::create_in(root.path()).unwrap();
        assert_ne!(a.path(), b.path());
        let name = a.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(SCRATCH_PREFIX), "got {name}");
    }

    #[test]
    fn missing_root_is_a_scratch_error() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("does-not-exist");
        assert!(matches!(
            ScratchDir::create_in(&missing),
            Err(OcrError::Scratch { .. })
        ));
    }
}
