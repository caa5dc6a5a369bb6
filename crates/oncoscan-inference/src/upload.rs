//! Image upload pre-checks.
//!
//! These mirror the acceptance rules of the prediction endpoint so that an
//! upload which would certainly be rejected never leaves the machine.

use serde::{Deserialize, Serialize};

use crate::prediction::{ClientResult, InferenceError};

/// Maximum accepted upload size (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// File extensions accepted by the service.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff"];

/// Content types accepted by the service.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/tiff",
    "image/tif",
];

/// An image selected for analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUpload {
    /// Original file name
    pub file_name: String,
    /// Declared content type, if the picker reported one
    pub content_type: Option<String>,
    /// Raw file bytes
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    /// Lowercased file extension, without the dot.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.file_name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_lowercase())
    }

    /// Content type to send and to embed in previews.
    ///
    /// Falls back to a type derived from the extension.
    pub fn effective_content_type(&self) -> String {
        if let Some(ct) = self.content_type.as_deref() {
            if ALLOWED_CONTENT_TYPES.contains(&ct) {
                return ct.to_string();
            }
        }
        match self.extension().as_deref() {
            Some("png") => "image/png",
            Some("tif") | Some("tiff") => "image/tiff",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            _ => "application/octet-stream",
        }
        .to_string()
    }

    /// Reject uploads the service would refuse.
    pub fn check(&self) -> ClientResult<()> {
        if self.bytes.is_empty() {
            return Err(InferenceError::UploadRejected("file is empty".into()));
        }
        if self.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(InferenceError::UploadRejected(format!(
                "file too large: {} bytes (max {})",
                self.bytes.len(),
                MAX_UPLOAD_BYTES
            )));
        }

        let type_ok = self
            .content_type
            .as_deref()
            .map(|ct| ALLOWED_CONTENT_TYPES.contains(&ct))
            .unwrap_or(false);
        let ext_ok = self
            .extension()
            .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false);

        if !type_ok && !ext_ok {
            return Err(InferenceError::UploadRejected(
                "unsupported format, expected JPG, PNG or TIFF".into(),
            ));
        }
        Ok(())
    }
}
