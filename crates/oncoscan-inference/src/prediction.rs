//! Prediction payloads returned by the inference service.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inference boundary errors.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    #[error("Service returned status {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

pub type ClientResult<T> = Result<T, InferenceError>;

/// Structured result of one image analysis.
///
/// `label` 0 is the negative (benign) class; any other value is positive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceResult {
    /// Class id predicted by the model
    pub label: u8,
    /// Human-readable class name, displayed verbatim
    pub prediction: String,
    /// Probability of the malignant class, in [0, 1]
    pub probability_cancer: f64,
    /// Model's self-reported certainty, in [0, 1]
    pub confidence: f64,
}

impl InferenceResult {
    /// Whether the label designates the positive class.
    pub fn is_positive(&self) -> bool {
        self.label != 0
    }

    /// Check the numeric ranges the service guarantees.
    pub fn validate(&self) -> ClientResult<()> {
        check_unit_interval("probability_cancer", self.probability_cancer)?;
        check_unit_interval("confidence", self.confidence)?;
        if self.prediction.trim().is_empty() {
            return Err(InferenceError::InvalidFormat(
                "prediction text is empty".into(),
            ));
        }
        Ok(())
    }
}

fn check_unit_interval(field: &str, value: f64) -> ClientResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(InferenceError::InvalidFormat(format!(
            "{} out of range: {}",
            field, value
        )));
    }
    Ok(())
}

/// Parse the body of a successful `/predict` response.
pub fn parse_prediction(json: &str) -> ClientResult<InferenceResult> {
    let json_start = json.find('{').ok_or_else(|| {
        InferenceError::InvalidFormat("No JSON object found in response".into())
    })?;
    let json_end = json[json_start..].rfind('}').ok_or_else(|| {
        InferenceError::InvalidFormat("No closing brace found in response".into())
    })?;

    let result: InferenceResult = serde_json::from_str(&json[json_start..=json_start + json_end])?;
    result.validate()?;
    Ok(result)
}

/// Error body returned by the service on failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Best-effort extraction of the service's error detail.
pub fn parse_error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail.or(b.error))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Health state of the service as seen by the client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ServiceStatus {
    Online,
    Offline,
}
