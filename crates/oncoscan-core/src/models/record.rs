//! Diagnostic record models.

use base64::Engine as _;
use chrono::{DateTime, Utc};
use oncoscan_inference::{ImageUpload, InferenceResult};
use serde::{Deserialize, Deserializer, Serialize};

use super::clinician::ClinicianId;
use super::patient::PatientProfile;

/// The analyzed image as carried by a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageAttachment {
    /// Original file name
    pub name: String,
    /// Self-contained `data:` URL of the image, if a preview was produced
    pub preview: Option<String>,
}

impl ImageAttachment {
    /// Build an attachment with an inline preview from an upload.
    pub fn from_upload(upload: &ImageUpload) -> Self {
        Self {
            name: upload.file_name.clone(),
            preview: Some(data_url(&upload.effective_content_type(), &upload.bytes)),
        }
    }

    /// Attachment without a preview.
    pub fn name_only(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            preview: None,
        }
    }
}

/// Encode bytes as an RFC 2397 base64 `data:` URL.
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// One completed analysis. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticRecord {
    /// Unique, time-ordered identifier (UUID v7). Older exports carry a
    /// millisecond timestamp number instead.
    #[serde(deserialize_with = "id_from_text_or_number")]
    pub id: String,
    /// Creation timestamp
    pub date: DateTime<Utc>,
    /// Snapshot of the patient profile at creation time
    pub patient: PatientProfile,
    /// Snapshot of the inference result
    pub result: InferenceResult,
    /// Original file name of the analyzed image
    pub image_name: String,
    /// Inline `data:` URL of the analyzed image
    #[serde(default)]
    pub image_preview: Option<String>,
    /// Clinician who created the record
    pub doctor: ClinicianId,
}

impl DiagnosticRecord {
    /// Whether the result designates the positive (malignant) class.
    pub fn is_positive(&self) -> bool {
        self.result.is_positive()
    }
}

fn id_from_text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url() {
        assert_eq!(data_url("image/png", b"abc"), "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_attachment_from_upload() {
        let upload = ImageUpload::new("slide.jpg", None, vec![0xff, 0xd8, 0xff]);
        let attachment = ImageAttachment::from_upload(&upload);
        assert_eq!(attachment.name, "slide.jpg");
        assert_eq!(
            attachment.preview.as_deref(),
            Some("data:image/jpeg;base64,/9j/")
        );
    }

    #[test]
    fn test_record_field_names() {
        let record = DiagnosticRecord {
            id: "0190d1a2-0000-7000-8000-000000000000".into(),
            date: "2024-05-01T09:30:00Z".parse().unwrap(),
            patient: PatientProfile::new("Awa", "Diop"),
            result: InferenceResult {
                label: 0,
                prediction: "Tissu sain".into(),
                probability_cancer: 0.12,
                confidence: 0.97,
            },
            image_name: "slide.png".into(),
            image_preview: None,
            doctor: ClinicianId::new("alice").unwrap(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["imageName"], "slide.png");
        assert_eq!(json["doctor"], "alice");
        assert_eq!(json["result"]["probability_cancer"], 0.12);
        assert!(json["imagePreview"].is_null());
        assert!(!record.is_positive());
    }

    #[test]
    fn test_numeric_id_read_as_text() {
        let json = r#"{
            "id": 1714555800000,
            "date": "2024-05-01T09:30:00.000Z",
            "patient": {"firstName": "Awa", "lastName": "Diop", "dateOfBirth": "1980-07-20",
                        "age": 43, "gender": "F", "patientId": ""},
            "result": {"prediction": "Tissu sain", "probability_cancer": 0.12, "label": 0, "confidence": 0.97},
            "imageName": "slide.png",
            "imagePreview": null,
            "doctor": "alice"
        }"#;

        let record: DiagnosticRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "1714555800000");
        assert_eq!(record.patient.patient_id, None);
        assert_eq!(record.patient.age(), Some(43));
        assert_eq!(serde_json::to_value(&record).unwrap()["id"], "1714555800000");
    }
}
