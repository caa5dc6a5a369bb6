//! Clients for the prediction service.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::prediction::{ClientResult, InferenceError, InferenceResult, ServiceStatus};
use crate::upload::ImageUpload;

/// A service able to classify one medical image.
///
/// Calls are blocking; callers are expected to keep a single request in
/// flight per session.
pub trait InferenceClient: Send + Sync {
    /// Submit an image and return the validated prediction.
    fn predict(&self, upload: &ImageUpload) -> ClientResult<InferenceResult>;

    /// Probe the service health endpoint.
    fn health(&self) -> ServiceStatus;
}

/// Mock client returning a canned outcome (for testing).
pub struct MockClient {
    outcome: Result<InferenceResult, String>,
    calls: AtomicUsize,
}

impl MockClient {
    /// Client that always succeeds with `result`.
    pub fn returning(result: InferenceResult) -> Self {
        Self {
            outcome: Ok(result),
            calls: AtomicUsize::new(0),
        }
    }

    /// Client that always fails with a transport error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `predict` calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InferenceClient for MockClient {
    fn predict(&self, upload: &ImageUpload) -> ClientResult<InferenceResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        upload.check()?;
        match &self.outcome {
            Ok(result) => Ok(result.clone()),
            Err(message) => Err(InferenceError::Transport(message.clone())),
        }
    }

    fn health(&self) -> ServiceStatus {
        match self.outcome {
            Ok(_) => ServiceStatus::Online,
            Err(_) => ServiceStatus::Offline,
        }
    }
}

#[cfg(feature = "http")]
pub use http::HttpClient;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use reqwest::blocking::multipart::{Form, Part};
    use reqwest::blocking::Client;

    use super::*;
    use crate::prediction::{parse_error_detail, parse_prediction};

    /// Blocking HTTP client for the `/predict` and `/health` endpoints.
    pub struct HttpClient {
        endpoint: String,
        client: Client,
    }

    impl HttpClient {
        /// Create a client for `endpoint` (e.g. `http://localhost:8080`).
        pub fn new(endpoint: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
            let client = Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| InferenceError::Transport(e.to_string()))?;
            Ok(Self {
                endpoint: endpoint.into().trim_end_matches('/').to_string(),
                client,
            })
        }

        fn url(&self, path: &str) -> String {
            format!("{}/{}", self.endpoint, path)
        }
    }

    impl InferenceClient for HttpClient {
        fn predict(&self, upload: &ImageUpload) -> ClientResult<InferenceResult> {
            upload.check()?;

            let part = Part::bytes(upload.bytes.clone())
                .file_name(upload.file_name.clone())
                .mime_str(&upload.effective_content_type())
                .map_err(|e| InferenceError::Transport(e.to_string()))?;
            let form = Form::new().part("file", part);

            tracing::info!(file = %upload.file_name, size = upload.bytes.len(), "submitting image for prediction");

            let response = self
                .client
                .post(self.url("predict"))
                .multipart(form)
                .send()
                .map_err(|e| InferenceError::Transport(e.to_string()))?;

            let status = response.status();
            let body = response
                .text()
                .map_err(|e| InferenceError::Transport(e.to_string()))?;

            if !status.is_success() {
                tracing::warn!(status = status.as_u16(), "prediction request failed");
                return Err(InferenceError::Status {
                    status: status.as_u16(),
                    detail: parse_error_detail(&body),
                });
            }

            parse_prediction(&body)
        }

        fn health(&self) -> ServiceStatus {
            match self.client.get(self.url("health")).send() {
                Ok(response) if response.status().is_success() => ServiceStatus::Online,
                Ok(response) => {
                    tracing::debug!(status = response.status().as_u16(), "service unhealthy");
                    ServiceStatus::Offline
                }
                Err(e) => {
                    tracing::debug!(error = %e, "service unreachable");
                    ServiceStatus::Offline
                }
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> InferenceResult {
        InferenceResult {
            label: 1,
            prediction: "Cancer détecté".into(),
            probability_cancer: 0.91,
            confidence: 0.91,
        }
    }

    fn sample_upload() -> ImageUpload {
        ImageUpload::new("slide.png", Some("image/png".into()), vec![1, 2, 3])
    }

    #[test]
    fn test_mock_returns_result() {
        let client = MockClient::returning(sample_result());
        let result = client.predict(&sample_upload()).unwrap();
        assert_eq!(result, sample_result());
        assert_eq!(client.calls(), 1);
        assert_eq!(client.health(), ServiceStatus::Online);
    }

    #[test]
    fn test_mock_failure_is_transport_error() {
        let client = MockClient::failing("connection refused");
        let err = client.predict(&sample_upload()).unwrap_err();
        assert!(matches!(err, InferenceError::Transport(ref m) if m == "connection refused"));
        assert_eq!(client.health(), ServiceStatus::Offline);
    }

    #[test]
    fn test_mock_applies_upload_checks() {
        let client = MockClient::returning(sample_result());
        let bad = ImageUpload::new("notes.txt", Some("text/plain".into()), vec![1]);
        assert!(matches!(
            client.predict(&bad),
            Err(InferenceError::UploadRejected(_))
        ));
    }
}
