//! Analysis workflow for one authenticated clinician.
//!
//! [`AnalysisSession::analyze`] runs the local validation gate, submits the
//! image to the inference service, builds the record and stores it. At most
//! one inference call is in flight per session.

use std::sync::atomic::{AtomicBool, Ordering};

use oncoscan_inference::{ImageUpload, InferenceClient, InferenceError, ServiceStatus};
use thiserror::Error;

use crate::builder::{validate_submission, Clock, RecordBuilder, SystemClock, ValidationError, ValidationErrors};
use crate::export::{ClinicalReport, ExportResult, HistoryExport, HistoryExporter, ReportRenderer, ReportSettings};
use crate::history::{HistoryBackend, HistoryError, HistoryResult, HistoryStore, HistorySummary};
use crate::models::{ClinicianId, DiagnosticRecord, ImageAttachment, PatientProfile};

/// Analysis failures. Every variant leaves the session usable.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Submission rejected: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Analysis failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("Diagnosis completed but not saved: {source}")]
    Persistence {
        /// The record that could not be stored
        record: Box<DiagnosticRecord>,
        #[source]
        source: HistoryError,
    },

    #[error("An analysis is already in progress")]
    Busy,
}

impl SessionError {
    /// Whether the user may simply trigger the action again.
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Validation(_) => true,
            SessionError::Inference(_) => true,
            SessionError::Persistence { .. } => true,
            SessionError::Busy => true,
        }
    }

    /// The completed but unsaved record, if any.
    pub fn unsaved_record(&self) -> Option<&DiagnosticRecord> {
        match self {
            SessionError::Persistence { record, .. } => Some(record.as_ref()),
            _ => None,
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Marks an inference call in flight; cleared on drop.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Session state of one authenticated clinician.
pub struct AnalysisSession<B: HistoryBackend, C: InferenceClient, K: Clock = SystemClock> {
    clinician: ClinicianId,
    store: HistoryStore<B>,
    client: C,
    builder: RecordBuilder<K>,
    settings: ReportSettings,
    in_flight: AtomicBool,
}

impl<B: HistoryBackend, C: InferenceClient> AnalysisSession<B, C, SystemClock> {
    pub fn new(clinician: ClinicianId, store: HistoryStore<B>, client: C) -> Self {
        Self {
            clinician,
            store,
            client,
            builder: RecordBuilder::new(),
            settings: ReportSettings::default(),
            in_flight: AtomicBool::new(false),
        }
    }
}

#[cfg(feature = "http")]
impl AnalysisSession<Box<dyn HistoryBackend>, oncoscan_inference::HttpClient> {
    /// Session for `clinician` over the configured storage and inference service.
    pub fn from_config(clinician: ClinicianId, config: &crate::config::CoreConfig) -> crate::config::ConfigResult<Self> {
        let store = HistoryStore::new(config.storage.open_backend()?);
        let client = config.inference.http_client()?;
        tracing::info!(clinician = %clinician, endpoint = %config.inference.endpoint, "analysis session opened");
        Ok(Self::new(clinician, store, client).with_report_settings(config.report_settings()))
    }
}

impl<B: HistoryBackend, C: InferenceClient, K: Clock> AnalysisSession<B, C, K> {
    /// Same session reading time from `clock`.
    pub fn with_clock<K2: Clock>(self, clock: K2) -> AnalysisSession<B, C, K2> {
        AnalysisSession {
            clinician: self.clinician,
            store: self.store,
            client: self.client,
            builder: RecordBuilder::with_clock(clock),
            settings: self.settings,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_report_settings(mut self, settings: ReportSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn clinician(&self) -> &ClinicianId {
        &self.clinician
    }

    pub fn store(&self) -> &HistoryStore<B> {
        &self.store
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn service_status(&self) -> ServiceStatus {
        self.client.health()
    }

    /// Analyze `upload` for `profile` and store the resulting record.
    ///
    /// Validation runs before the inference call; a rejected submission
    /// never reaches the service.
    pub fn analyze(
        &self,
        profile: &PatientProfile,
        upload: Option<&ImageUpload>,
    ) -> SessionResult<DiagnosticRecord> {
        let today = self.builder.now().date_naive();
        let attachment = upload.map(ImageAttachment::from_upload);

        let mut errors = validate_submission(profile, attachment.as_ref(), today)
            .err()
            .unwrap_or_default();
        if let Some(Err(e)) = upload.map(|u| u.check()) {
            errors.0.push(ValidationError::InvalidImage(e.to_string()));
        }
        if !errors.is_empty() {
            tracing::debug!(clinician = %self.clinician, reasons = %errors, "submission rejected");
            return Err(errors.into());
        }
        let (Some(upload), Some(attachment)) = (upload, attachment) else {
            return Err(ValidationErrors(vec![ValidationError::MissingImage]).into());
        };

        let _in_flight = InFlight::acquire(&self.in_flight).ok_or(SessionError::Busy)?;

        let result = self.client.predict(upload).map_err(|e| {
            tracing::warn!(clinician = %self.clinician, error = %e, "analysis failed");
            e
        })?;

        let record = self
            .builder
            .build(profile, &result, Some(&attachment), &self.clinician)?;
        self.save(record)
    }

    /// Store a record whose first save failed.
    pub fn retry_save(&self, record: DiagnosticRecord) -> SessionResult<DiagnosticRecord> {
        self.save(record)
    }

    fn save(&self, record: DiagnosticRecord) -> SessionResult<DiagnosticRecord> {
        match self.store.append(&self.clinician, record.clone()) {
            Ok(_) => Ok(record),
            Err(source) => {
                tracing::error!(
                    clinician = %self.clinician,
                    record_id = %record.id,
                    error = %source,
                    "diagnostic record not saved"
                );
                Err(SessionError::Persistence {
                    record: Box::new(record),
                    source,
                })
            }
        }
    }

    /// Records of this clinician, newest first.
    pub fn history(&self) -> Vec<DiagnosticRecord> {
        self.store.load(&self.clinician)
    }

    pub fn summary(&self) -> HistorySummary {
        self.store.summary(&self.clinician)
    }

    /// Full-history export stamped with the current time.
    pub fn export(&self) -> HistoryExport {
        HistoryExporter::new(&self.store).export(&self.clinician, self.builder.now())
    }

    /// Printable report for record `id`.
    pub fn report(&self, id: &str) -> ExportResult<ClinicalReport> {
        ReportRenderer::new(&self.store, &self.settings).report(&self.clinician, id, self.builder.now())
    }

    /// End the session, discarding this clinician's history.
    pub fn logout(self) -> HistoryResult<()> {
        self.store.clear(&self.clinician)?;
        tracing::info!(clinician = %self.clinician, "clinician logged out");
        Ok(())
    }
}
