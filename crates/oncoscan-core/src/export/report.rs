//! Single-record clinical report.
//!
//! A [`ClinicalReport`] is a structured document with seven fixed sections
//! built from one [`DiagnosticRecord`]. Building it reads the record only;
//! rendering (see [`ClinicalReport::render_html`] and
//! [`ClinicalReport::render_text`]) is a pure function of the report, so two
//! reports built from the same record differ only in the footer timestamp.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use super::locale::Locale;
use super::{ExportError, ExportResult};
use crate::history::{HistoryBackend, HistoryStore};
use crate::models::{ClinicianId, DiagnosticRecord};

/// Default model accuracy on the reference test set.
pub const DEFAULT_MODEL_ACCURACY: f64 = 0.952;

/// Issuing institution shown in the header and footer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Institution {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

impl Default for Institution {
    fn default() -> Self {
        Self {
            name: "Hôpital Principal de Dakar".to_string(),
            address: "Avenue Nelson Mandela, Dakar, Sénégal".to_string(),
            phone: "+221 33 823 45 67".to_string(),
            email: "admin@cancerdetection.sn".to_string(),
        }
    }
}

/// Everything a report needs besides the record itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportSettings {
    pub institution: Institution,
    pub locale: Locale,
    /// Fraction in [0, 1], quoted in the disclaimer
    pub model_accuracy: f64,
    /// Offset applied to record and generation timestamps
    pub utc_offset_minutes: i32,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            institution: Institution::default(),
            locale: Locale::default(),
            model_accuracy: DEFAULT_MODEL_ACCURACY,
            utc_offset_minutes: 0,
        }
    }
}

impl ReportSettings {
    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
    }

    /// Accuracy as quoted in the disclaimer, e.g. `95.2%`.
    pub fn accuracy_display(&self) -> String {
        format!("{:.1}%", self.model_accuracy * 100.0)
    }
}

/// Visual treatment of the result block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Treatment {
    Negative,
    Positive,
}

/// Color of a progress bar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Green,
    Red,
}

/// A percentage with its progress bar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metric {
    pub label: String,
    /// Raw value in [0, 1]
    pub value: f64,
    /// Two-decimal percentage, e.g. `12.00%`
    pub display: String,
    /// Bar width in percent of the track
    pub bar_width: f64,
    pub tone: Tone,
}

impl Metric {
    fn new(label: &str, value: f64, tone: Tone) -> Self {
        let percent = value * 100.0;
        Self {
            label: label.to_string(),
            value,
            display: format!("{:.2}%", percent),
            bar_width: percent,
            tone,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportHeader {
    pub title: String,
    pub subtitle: String,
    pub institution: Institution,
}

/// Patient block. Optional values are omitted from the rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientSection {
    pub full_name: String,
    pub date_of_birth: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub patient_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticSection {
    pub exam_date: String,
    pub exam_time: String,
    pub clinician: String,
    pub institution: String,
    pub image_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultSection {
    pub treatment: Treatment,
    /// Class name as returned by the service, shown verbatim
    pub prediction: String,
    pub probability: Metric,
    pub confidence: Metric,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageSection {
    pub name: String,
    pub data_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignatureFooter {
    pub clinician: String,
    pub institution: String,
    /// Record id
    pub reference: String,
    /// Localized generation timestamp
    pub generated_at: String,
}

/// Printable report for one record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicalReport {
    pub locale: Locale,
    pub header: ReportHeader,
    pub patient: PatientSection,
    pub diagnostic: DiagnosticSection,
    pub result: ResultSection,
    pub image: Option<ImageSection>,
    pub disclaimer: String,
    pub footer: SignatureFooter,
}

impl ClinicalReport {
    /// Build the report sections for `record`.
    pub fn from_record(
        record: &DiagnosticRecord,
        settings: &ReportSettings,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let locale = settings.locale;
        let labels = locale.labels();
        let offset = settings.offset();
        let exam_at = record.date.with_timezone(&offset);
        let clinician = format!("{} {}", labels.doctor_prefix, record.doctor);

        let patient = &record.patient;
        let result = &record.result;

        let treatment = if result.label == 0 {
            Treatment::Negative
        } else {
            Treatment::Positive
        };
        let probability_tone = if result.probability_cancer > 0.5 {
            Tone::Red
        } else {
            Tone::Green
        };

        Self {
            locale,
            header: ReportHeader {
                title: labels.report_title.to_string(),
                subtitle: labels.subtitle.to_string(),
                institution: settings.institution.clone(),
            },
            patient: PatientSection {
                full_name: patient.full_name(),
                date_of_birth: patient.date_of_birth.map(|d| locale.format_date(d)),
                age: patient.age(),
                gender: patient.gender.map(|g| locale.gender(g).to_string()),
                patient_id: patient
                    .patient_id
                    .as_deref()
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string),
            },
            diagnostic: DiagnosticSection {
                exam_date: locale.format_date(exam_at.date_naive()),
                exam_time: locale.format_time(exam_at),
                clinician: clinician.clone(),
                institution: settings.institution.name.clone(),
                image_name: record.image_name.clone(),
            },
            result: ResultSection {
                treatment,
                prediction: result.prediction.clone(),
                probability: Metric::new(labels.probability, result.probability_cancer, probability_tone),
                confidence: Metric::new(labels.confidence, result.confidence, Tone::Green),
            },
            image: record.image_preview.as_ref().map(|url| ImageSection {
                name: record.image_name.clone(),
                data_url: url.clone(),
            }),
            disclaimer: locale.disclaimer(&settings.accuracy_display()),
            footer: SignatureFooter {
                clinician,
                institution: settings.institution.name.clone(),
                reference: record.id.clone(),
                generated_at: locale.format_date_time(generated_at.with_timezone(&offset)),
            },
        }
    }
}

/// Builds reports for records held in a history store.
pub struct ReportRenderer<'a, B: HistoryBackend> {
    store: &'a HistoryStore<B>,
    settings: &'a ReportSettings,
}

impl<'a, B: HistoryBackend> ReportRenderer<'a, B> {
    pub fn new(store: &'a HistoryStore<B>, settings: &'a ReportSettings) -> Self {
        Self { store, settings }
    }

    /// Report for record `id` of `user`.
    pub fn report(
        &self,
        user: &ClinicianId,
        id: &str,
        generated_at: DateTime<Utc>,
    ) -> ExportResult<ClinicalReport> {
        let record = self
            .store
            .get(user, id)
            .ok_or_else(|| ExportError::RecordNotFound(id.to_string()))?;
        tracing::debug!(clinician = %user, record_id = %id, "rendering report");
        Ok(ClinicalReport::from_record(&record, self.settings, generated_at))
    }
}
