//! Full-history JSON export.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{ExportError, ExportResult};
use crate::history::{HistoryBackend, HistoryStore};
use crate::models::{ClinicianId, DiagnosticRecord};

/// Current bulk export format version.
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

/// Full history export for one clinician.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryExport {
    /// Export metadata
    pub metadata: ExportMetadata,
    /// Records, newest first
    pub records: Vec<DiagnosticRecord>,
}

/// Bulk export metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportMetadata {
    /// Export format version
    pub format_version: String,
    /// Export timestamp
    pub exported_at: DateTime<Utc>,
    /// Clinician whose history this is
    pub clinician: ClinicianId,
    /// Number of records
    pub record_count: usize,
}

impl HistoryExport {
    pub fn new(user: &ClinicianId, records: Vec<DiagnosticRecord>, exported_at: DateTime<Utc>) -> Self {
        Self {
            metadata: ExportMetadata {
                format_version: EXPORT_FORMAT_VERSION.to_string(),
                exported_at,
                clinician: user.clone(),
                record_count: records.len(),
            },
            records,
        }
    }

    /// Export to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Download file name for this export.
    pub fn filename(&self) -> String {
        export_filename(&self.metadata.clinician, self.metadata.exported_at.date_naive())
    }
}

/// `diagnostic_history_<clinician>_<YYYY-MM-DD>.json`
pub fn export_filename(user: &ClinicianId, date: NaiveDate) -> String {
    format!(
        "diagnostic_history_{}_{}.json",
        user.as_str(),
        date.format("%Y-%m-%d")
    )
}

/// Parse a bulk export back into its records.
///
/// Accepts the [`HistoryExport`] envelope as well as a bare JSON array of
/// records. Record order is preserved.
pub fn parse_history_export(json: &str) -> ExportResult<Vec<DiagnosticRecord>> {
    let value: serde_json::Value = serde_json::from_str(json)?;

    if value.is_array() {
        return Ok(serde_json::from_value(value)?);
    }

    let export: HistoryExport = serde_json::from_value(value)?;
    if export.metadata.record_count != export.records.len() {
        return Err(ExportError::Inconsistent(format!(
            "metadata announces {} records, document holds {}",
            export.metadata.record_count,
            export.records.len()
        )));
    }
    Ok(export.records)
}

/// Builds bulk exports from a history store.
pub struct HistoryExporter<'a, B: HistoryBackend> {
    store: &'a HistoryStore<B>,
}

impl<'a, B: HistoryBackend> HistoryExporter<'a, B> {
    pub fn new(store: &'a HistoryStore<B>) -> Self {
        Self { store }
    }

    /// Export the full history of `user`.
    pub fn export(&self, user: &ClinicianId, exported_at: DateTime<Utc>) -> HistoryExport {
        let records = self.store.load(user);
        tracing::info!(clinician = %user, records = records.len(), "history exported");
        HistoryExport::new(user, records, exported_at)
    }
}
