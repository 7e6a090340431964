//! Local files sent alongside a message.
//!
//! Everything here runs before the network is touched: a bad path must fail
//! with a validation error without creating a conversation or posting anything.

use std::path::{Path, PathBuf};

use crate::constants::SUPPORTED_EXTENSIONS;
use crate::error::{PlaylabError, Result};

/// A validated file, read fully into memory.
#[derive(Clone)]
pub struct Attachment {
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("path", &self.path)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Attachment {
    /// Validate and read `path`.
    ///
    /// Fails with [`PlaylabError::Validation`] when the file is missing, is not
    /// a regular file, has an unsupported extension or cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path).map_err(|_| {
            PlaylabError::Validation(format!("File not found: {}", path.display()))
        })?;
        if !meta.is_file() {
            return Err(PlaylabError::Validation(format!(
                "Not a regular file: {}",
                path.display()
            )));
        }

        if !is_supported(path) {
            return Err(PlaylabError::Validation(format!(
                "Unsupported attachment type: {} (supported: {})",
                path.display(),
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                PlaylabError::Validation(format!("Attachment has no file name: {}", path.display()))
            })?;

        let bytes = std::fs::read(path).map_err(|e| {
            PlaylabError::Validation(format!("Cannot read {}: {}", path.display(), e))
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            mime_type: mime_type(path),
            bytes,
        })
    }
}

/// Whether `path` has one of the accepted attachment extensions.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext)))
}

/// MIME type guessed from the file extension, `application/octet-stream` if unknown.
pub fn mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string()
}
