//! Core runtime configuration.
//!
//! Configuration is resolved once at startup (typically from a YAML file) and
//! then passed into the services that need it. Nothing in the crate reads
//! configuration from the environment while handling a request.

use std::path::{Path, PathBuf};
use std::time::Duration;

use oncoscan_inference::InferenceError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::export::{Institution, Locale, ReportSettings, DEFAULT_MODEL_ACCURACY};
use crate::history::{FileBackend, HistoryBackend, HistoryError, HistoryResult, MemoryBackend, SqliteBackend};

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Storage unavailable: {0}")]
    Storage(#[from] HistoryError),

    #[error("Inference client unavailable: {0}")]
    Inference(#[from] InferenceError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where clinician histories are persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Process-local, lost on exit
    Memory,
    /// SQLite database file
    Sqlite { path: PathBuf },
    /// One JSON document per clinician under `dir`
    File { dir: PathBuf },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: PathBuf::from("oncoscan_history.db"),
        }
    }
}

impl StorageConfig {
    /// Open the configured backend.
    pub fn open_backend(&self) -> HistoryResult<Box<dyn HistoryBackend>> {
        let backend: Box<dyn HistoryBackend> = match self {
            StorageConfig::Memory => Box::new(MemoryBackend::new()),
            StorageConfig::Sqlite { path } => Box::new(SqliteBackend::open(path)?),
            StorageConfig::File { dir } => Box::new(FileBackend::open(dir)?),
        };
        tracing::info!(storage = ?self, "history backend opened");
        Ok(backend)
    }
}

/// Inference service location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InferenceConfig {
    /// Base URL; `/predict` and `/health` are appended
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Blocking client for the configured service.
    #[cfg(feature = "http")]
    pub fn http_client(&self) -> oncoscan_inference::ClientResult<oncoscan_inference::HttpClient> {
        oncoscan_inference::HttpClient::new(self.endpoint.trim(), self.timeout())
    }
}

/// Core configuration resolved at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    pub institution: Institution,
    pub locale: Locale,
    /// Fraction in [0, 1]
    pub model_accuracy: f64,
    /// Offset applied to dates printed in reports
    pub utc_offset_minutes: i32,
    pub storage: StorageConfig,
    pub inference: InferenceConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            institution: Institution::default(),
            locale: Locale::default(),
            model_accuracy: DEFAULT_MODEL_ACCURACY,
            utc_offset_minutes: 0,
            storage: StorageConfig::default(),
            inference: InferenceConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Parse and validate a YAML document. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: CoreConfig = if yaml.trim().is_empty() {
            CoreConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate the YAML file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let config = Self::from_yaml_str(&std::fs::read_to_string(path)?)?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !self.model_accuracy.is_finite() || !(0.0..=1.0).contains(&self.model_accuracy) {
            return Err(ConfigError::Invalid(format!(
                "model_accuracy must be within [0, 1], got {}",
                self.model_accuracy
            )));
        }
        if self.institution.name.trim().is_empty() {
            return Err(ConfigError::Invalid("institution.name cannot be empty".into()));
        }
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::Invalid(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            )));
        }

        let endpoint = self.inference.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "inference.endpoint must be an http(s) URL, got {:?}",
                self.inference.endpoint
            )));
        }
        if self.inference.timeout_secs == 0 {
            return Err(ConfigError::Invalid("inference.timeout_secs must be positive".into()));
        }

        match &self.storage {
            StorageConfig::Sqlite { path } if path.as_os_str().is_empty() => {
                Err(ConfigError::Invalid("storage.path cannot be empty".into()))
            }
            StorageConfig::File { dir } if dir.as_os_str().is_empty() => {
                Err(ConfigError::Invalid("storage.dir cannot be empty".into()))
            }
            _ => Ok(()),
        }
    }

    /// Settings used to render clinical reports.
    pub fn report_settings(&self) -> ReportSettings {
        ReportSettings {
            institution: self.institution.clone(),
            locale: self.locale,
            model_accuracy: self.model_accuracy,
            utc_offset_minutes: self.utc_offset_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = CoreConfig::from_yaml_str("").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.locale, Locale::Fr);
        assert_eq!(config.report_settings().accuracy_display(), "95.2%");
    }

    #[test]
    fn test_partial_document() {
        let yaml = r#"
locale: en
model_accuracy: 0.9
institution:
  name: Clinique Pasteur
storage:
  backend: file
  dir: /var/lib/oncoscan
inference:
  endpoint: https://inference.example.org
"#;
        let config = CoreConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.locale, Locale::En);
        assert_eq!(config.institution.name, "Clinique Pasteur");
        assert_eq!(config.institution.phone, Institution::default().phone);
        assert_eq!(
            config.storage,
            StorageConfig::File {
                dir: PathBuf::from("/var/lib/oncoscan")
            }
        );
        assert_eq!(config.inference.timeout(), Duration::from_secs(30));
        assert_eq!(config.report_settings().accuracy_display(), "90.0%");
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            CoreConfig::from_yaml_str("model_accuracy: 1.5"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            CoreConfig::from_yaml_str("inference:\n  endpoint: localhost:8000"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            CoreConfig::from_yaml_str("utc_offset_minutes: 1440"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            CoreConfig::from_yaml_str("storage:\n  backend: sqlite\n  path: ''"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_yaml() {
        assert!(matches!(
            CoreConfig::from_yaml_str("storage:\n  backend: floppy"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_load_from_file_and_open_backend() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("history.db");
        let config_path = dir.path().join("oncoscan.yaml");
        std::fs::write(
            &config_path,
            format!("storage:\n  backend: sqlite\n  path: {}\n", db_path.display()),
        )
        .unwrap();

        let config = CoreConfig::load(&config_path).unwrap();
        let backend = config.storage.open_backend().unwrap();
        backend.write("diagnostic_history_alice", "[]").unwrap();

        assert!(db_path.exists());
        assert_eq!(
            backend.read("diagnostic_history_alice").unwrap().as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            CoreConfig::load("/nonexistent/oncoscan.yaml"),
            Err(ConfigError::Io(_))
        ));
    }
}
