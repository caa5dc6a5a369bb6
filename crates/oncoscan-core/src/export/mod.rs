//! Export functionality: full-history JSON and printable clinical reports.

mod bulk;
mod locale;
mod render;
mod report;

pub use bulk::*;
pub use locale::*;
pub use report::*;

use thiserror::Error;

/// Export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Inconsistent export document: {0}")]
    Inconsistent(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),
}

pub type ExportResult<T> = Result<T, ExportError>;
