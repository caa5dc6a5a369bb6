//! Oncoscan Core Library
//!
//! Diagnostic-record subsystem of an AI-assisted cancer screening assistant:
//! patient intake, per-clinician history and clinical reports.
//!
//! # Architecture
//!
//! ```text
//! PatientProfile + Image ──▶ validate (local gate)
//!                                   │
//!                                   ▼
//!                        Inference service (external)
//!                                   │ InferenceResult
//!                                   ▼
//!                            RecordBuilder::build
//!                                   │ DiagnosticRecord
//!                                   ▼
//!                 ┌──────── HistoryStore (per clinician) ────────┐
//!                 │   key = diagnostic_history_<clinician>       │
//!                 │   value = [newest, ..., oldest] as JSON      │
//!                 └──────────────────┬───────────────────────────┘
//!                                    │
//!                    ┌───────────────┴───────────────┐
//!                    ▼                               ▼
//!               Bulk export                   Clinical report
//!          (JSON, re-parseable)          (HTML / text, 7 sections)
//! ```
//!
//! # Core Principle
//!
//! **A record is a frozen snapshot.** Once built it is never edited; a
//! clinician's history only grows by prepending and only shrinks by being
//! cleared as a whole.
//!
//! # Modules
//!
//! - [`models`]: Domain types (PatientProfile, DiagnosticRecord, ClinicianId)
//! - [`builder`]: Age derivation, intake validation, record construction
//! - [`history`]: Per-clinician history over memory, SQLite or file backends
//! - [`db`]: SQLite layer used by the SQLite backend
//! - [`export`]: Bulk JSON export and clinical report rendering
//! - [`session`]: Analysis workflow for one authenticated clinician
//! - [`config`]: Startup configuration loaded from YAML
//! - [`logging`]: Tracing subscriber setup

pub mod builder;
pub mod config;
pub mod db;
pub mod export;
pub mod history;
pub mod logging;
pub mod models;
pub mod session;

// Re-export commonly used types
pub use builder::{compute_age, validate, Clock, RecordBuilder, SystemClock, ValidationError, ValidationErrors};
pub use config::{CoreConfig, StorageConfig};
pub use db::Database;
pub use export::{ClinicalReport, HistoryExport, Locale, ReportSettings};
pub use history::{HistoryBackend, HistoryStore, HistorySummary};
pub use logging::init_logging;
pub use models::{ClinicianId, DiagnosticRecord, Gender, ImageAttachment, InferenceResult, PatientProfile};
pub use session::{AnalysisSession, SessionError};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use oncoscan_inference::ImageUpload;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum OncoscanError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The analysis completed but its record could not be stored.
    /// `record_json` can be handed back to `save_record`.
    #[error("Diagnosis completed but not saved: {reason}")]
    NotSaved { record_json: String, reason: String },
}

impl From<history::HistoryError> for OncoscanError {
    fn from(e: history::HistoryError) -> Self {
        OncoscanError::StorageError(e.to_string())
    }
}

impl From<db::DbError> for OncoscanError {
    fn from(e: db::DbError) -> Self {
        OncoscanError::StorageError(e.to_string())
    }
}

impl From<export::ExportError> for OncoscanError {
    fn from(e: export::ExportError) -> Self {
        match e {
            export::ExportError::RecordNotFound(id) => OncoscanError::NotFound(id),
            other => OncoscanError::SerializationError(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for OncoscanError {
    fn from(e: config::ConfigError) -> Self {
        OncoscanError::ConfigError(e.to_string())
    }
}

impl From<ValidationErrors> for OncoscanError {
    fn from(e: ValidationErrors) -> Self {
        OncoscanError::InvalidInput(e.to_string())
    }
}

impl From<serde_json::Error> for OncoscanError {
    fn from(e: serde_json::Error) -> Self {
        OncoscanError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for OncoscanError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        OncoscanError::StorageError(format!("Lock poisoned: {}", e))
    }
}

fn clinician(username: &str) -> Result<ClinicianId, OncoscanError> {
    ClinicianId::new(username)
        .ok_or_else(|| OncoscanError::InvalidInput("clinician identity is required".into()))
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open the core described by a YAML configuration document.
#[uniffi::export]
pub fn open_core(config_yaml: String) -> Result<Arc<OncoscanCore>, OncoscanError> {
    let config = CoreConfig::from_yaml_str(&config_yaml)?;
    OncoscanCore::from_config(&config).map(Arc::new)
}

/// Open the core with the configuration file at `path`.
#[uniffi::export]
pub fn open_core_from_file(path: String) -> Result<Arc<OncoscanCore>, OncoscanError> {
    let config = CoreConfig::load(&path)?;
    OncoscanCore::from_config(&config).map(Arc::new)
}

/// Core with in-memory storage and default settings (for testing).
#[uniffi::export]
pub fn open_core_in_memory() -> Arc<OncoscanCore> {
    Arc::new(OncoscanCore::new(
        Box::new(history::MemoryBackend::new()),
        ReportSettings::default(),
    ))
}

/// Install the default tracing subscriber.
#[uniffi::export]
pub fn enable_logging(filter: Option<String>) -> bool {
    init_logging(filter.as_deref())
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe history and report service for FFI.
#[derive(uniffi::Object)]
pub struct OncoscanCore {
    store: Arc<Mutex<HistoryStore<Box<dyn HistoryBackend>>>>,
    settings: ReportSettings,
    builder: RecordBuilder,
}

impl OncoscanCore {
    pub fn new(backend: Box<dyn HistoryBackend>, settings: ReportSettings) -> Self {
        Self {
            store: Arc::new(Mutex::new(HistoryStore::new(backend))),
            settings,
            builder: RecordBuilder::new(),
        }
    }

    pub fn from_config(config: &CoreConfig) -> Result<Self, OncoscanError> {
        let backend = config.storage.open_backend()?;
        Ok(Self::new(backend, config.report_settings()))
    }
}

#[uniffi::export]
impl OncoscanCore {
    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Build a record from a completed analysis and prepend it to the history.
    pub fn record_analysis(
        &self,
        clinician_id: String,
        patient: FfiPatientProfile,
        result: FfiInferenceResult,
        image: FfiImage,
    ) -> Result<FfiDiagnosticRecord, OncoscanError> {
        let doctor = clinician(&clinician_id)?;
        let today = self.builder.now().date_naive();
        let profile = patient.into_profile(today)?;
        let attachment = ImageAttachment::from_upload(&image.into());

        let record = self
            .builder
            .build(&profile, &result.into(), Some(&attachment), &doctor)?;
        self.save(&doctor, record)
    }

    /// Store a record returned in `NotSaved` by an earlier call.
    pub fn save_record(
        &self,
        clinician_id: String,
        record_json: String,
    ) -> Result<FfiDiagnosticRecord, OncoscanError> {
        let doctor = clinician(&clinician_id)?;
        let record: DiagnosticRecord = serde_json::from_str(&record_json)?;
        if record.doctor != doctor {
            return Err(OncoscanError::InvalidInput(format!(
                "record {} belongs to another clinician",
                record.id
            )));
        }
        self.save(&doctor, record)
    }

    /// Records of a clinician, newest first.
    pub fn list_records(&self, clinician_id: String) -> Result<Vec<FfiDiagnosticRecord>, OncoscanError> {
        let doctor = clinician(&clinician_id)?;
        let store = self.store.lock()?;
        Ok(store.load(&doctor).into_iter().map(|r| r.into()).collect())
    }

    /// Get one record by id.
    pub fn get_record(
        &self,
        clinician_id: String,
        record_id: String,
    ) -> Result<Option<FfiDiagnosticRecord>, OncoscanError> {
        let doctor = clinician(&clinician_id)?;
        let store = self.store.lock()?;
        Ok(store.get(&doctor, &record_id).map(|r| r.into()))
    }

    /// Dashboard counters.
    pub fn get_summary(&self, clinician_id: String) -> Result<FfiHistorySummary, OncoscanError> {
        let doctor = clinician(&clinician_id)?;
        let store = self.store.lock()?;
        Ok(store.summary(&doctor).into())
    }

    /// Discard the whole history of a clinician (logout).
    pub fn clear_history(&self, clinician_id: String) -> Result<(), OncoscanError> {
        let doctor = clinician(&clinician_id)?;
        let store = self.store.lock()?;
        store.clear(&doctor)?;
        Ok(())
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Export the full history as JSON.
    pub fn export_history_json(&self, clinician_id: String) -> Result<FfiExportFile, OncoscanError> {
        let doctor = clinician(&clinician_id)?;
        let store = self.store.lock()?;
        let export = export::HistoryExporter::new(&*store).export(&doctor, self.builder.now());
        Ok(FfiExportFile {
            filename: export.filename(),
            contents: export.to_json()?,
        })
    }

    /// Parse a previously exported history, without storing it.
    pub fn parse_history_json(&self, json: String) -> Result<Vec<FfiDiagnosticRecord>, OncoscanError> {
        let records = export::parse_history_export(&json)?;
        Ok(records.into_iter().map(|r| r.into()).collect())
    }

    /// Render the clinical report of one record as a standalone HTML document.
    pub fn render_report_html(
        &self,
        clinician_id: String,
        record_id: String,
    ) -> Result<String, OncoscanError> {
        Ok(self.report(&clinician_id, &record_id)?.render_html())
    }

    /// Render the clinical report of one record as plain text.
    pub fn render_report_text(
        &self,
        clinician_id: String,
        record_id: String,
    ) -> Result<String, OncoscanError> {
        Ok(self.report(&clinician_id, &record_id)?.render_text())
    }
}

impl OncoscanCore {
    fn save(&self, doctor: &ClinicianId, record: DiagnosticRecord) -> Result<FfiDiagnosticRecord, OncoscanError> {
        let store = self.store.lock()?;
        match store.append(doctor, record.clone()) {
            Ok(_) => Ok(record.into()),
            Err(e) => {
                tracing::error!(clinician = %doctor, record_id = %record.id, error = %e, "diagnostic record not saved");
                Err(OncoscanError::NotSaved {
                    record_json: serde_json::to_string(&record)?,
                    reason: e.to_string(),
                })
            }
        }
    }

    fn report(&self, clinician_id: &str, record_id: &str) -> Result<ClinicalReport, OncoscanError> {
        let doctor = clinician(clinician_id)?;
        let store = self.store.lock()?;
        let renderer = export::ReportRenderer::new(&*store, &self.settings);
        Ok(renderer.report(&doctor, record_id, Utc::now())?)
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient profile. Dates are `YYYY-MM-DD`, gender is `M` or `F`.
/// `age` is derived and ignored on input.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientProfile {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub patient_id: Option<String>,
}

impl FfiPatientProfile {
    fn into_profile(self, as_of: NaiveDate) -> Result<PatientProfile, OncoscanError> {
        let date_of_birth = self
            .date_of_birth
            .filter(|d| !d.trim().is_empty())
            .map(|d| {
                NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
                    .map_err(|e| OncoscanError::InvalidInput(format!("date of birth {:?}: {}", d, e)))
            })
            .transpose()?;
        let gender = match self.gender.as_deref().map(str::trim) {
            None | Some("") => None,
            Some("M") => Some(Gender::Male),
            Some("F") => Some(Gender::Female),
            Some(other) => {
                return Err(OncoscanError::InvalidInput(format!("unknown gender {:?}", other)))
            }
        };

        let mut profile = PatientProfile::new(self.first_name, self.last_name);
        profile.set_date_of_birth(date_of_birth, as_of);
        profile.gender = gender;
        profile.patient_id = self.patient_id.filter(|id| !id.trim().is_empty());
        Ok(profile)
    }
}

impl From<PatientProfile> for FfiPatientProfile {
    fn from(p: PatientProfile) -> Self {
        Self {
            age: p.age(),
            date_of_birth: p.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
            gender: p.gender.map(|g| {
                match g {
                    Gender::Male => "M",
                    Gender::Female => "F",
                }
                .to_string()
            }),
            first_name: p.first_name,
            last_name: p.last_name,
            patient_id: p.patient_id,
        }
    }
}

/// FFI-safe inference result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiInferenceResult {
    pub label: u8,
    pub prediction: String,
    pub probability_cancer: f64,
    pub confidence: f64,
}

impl From<FfiInferenceResult> for InferenceResult {
    fn from(r: FfiInferenceResult) -> Self {
        InferenceResult {
            label: r.label,
            prediction: r.prediction,
            probability_cancer: r.probability_cancer,
            confidence: r.confidence,
        }
    }
}

/// FFI-safe analyzed image.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiImage {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl From<FfiImage> for ImageUpload {
    fn from(image: FfiImage) -> Self {
        ImageUpload::new(image.file_name, image.content_type, image.bytes)
    }
}

/// FFI-safe diagnostic record.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDiagnosticRecord {
    pub id: String,
    /// RFC 3339 timestamp
    pub date: String,
    pub patient: FfiPatientProfile,
    pub result: FfiInferenceResult,
    pub image_name: String,
    pub image_preview: Option<String>,
    pub doctor: String,
    pub is_positive: bool,
}

impl From<DiagnosticRecord> for FfiDiagnosticRecord {
    fn from(r: DiagnosticRecord) -> Self {
        let is_positive = r.is_positive();
        Self {
            id: r.id,
            date: r.date.to_rfc3339(),
            patient: r.patient.into(),
            result: FfiInferenceResult {
                label: r.result.label,
                prediction: r.result.prediction,
                probability_cancer: r.result.probability_cancer,
                confidence: r.result.confidence,
            },
            image_name: r.image_name,
            image_preview: r.image_preview,
            doctor: r.doctor.into(),
            is_positive,
        }
    }
}

/// FFI-safe history summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiHistorySummary {
    pub total: u32,
    pub positive: u32,
    pub negative: u32,
    pub latest: Option<String>,
}

impl From<HistorySummary> for FfiHistorySummary {
    fn from(s: HistorySummary) -> Self {
        Self {
            total: s.total as u32,
            positive: s.positive as u32,
            negative: s.negative as u32,
            latest: s.latest.map(|d| d.to_rfc3339()),
        }
    }
}

/// Export document with its download name.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiExportFile {
    pub filename: String,
    pub contents: String,
}
