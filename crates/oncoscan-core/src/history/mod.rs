//! Per-clinician diagnostic history.
//!
//! A [`HistoryStore`] maps each clinician identity to the ordered sequence of
//! that clinician's records, newest first. The full sequence is stored as a
//! single JSON document under a key derived from the identity, so each write
//! replaces the whole document at once.
//!
//! Backends are pluggable through [`HistoryBackend`]:
//!
//! - [`MemoryBackend`]: process-local map, for tests and ephemeral sessions
//! - [`SqliteBackend`]: one row per key in an SQLite database
//! - [`FileBackend`]: one JSON file per key, replaced via rename

mod file;
mod memory;
mod sqlite;

pub use file::*;
pub use memory::*;
pub use sqlite::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DbError;
use crate::models::{ClinicianId, DiagnosticRecord};

/// Prefix of every history storage key.
pub const STORAGE_KEY_PREFIX: &str = "diagnostic_history_";

/// History persistence errors.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage quota exceeded: {needed} bytes needed, {limit} allowed")]
    QuotaExceeded { needed: usize, limit: usize },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl<T> From<std::sync::PoisonError<T>> for HistoryError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        HistoryError::LockPoisoned
    }
}

pub type HistoryResult<T> = Result<T, HistoryError>;

/// Key-value persistence for serialized histories.
pub trait HistoryBackend: Send + Sync {
    /// Read the document stored under `key`, if any.
    fn read(&self, key: &str) -> HistoryResult<Option<String>>;

    /// Replace the document stored under `key`.
    fn write(&self, key: &str, value: &str) -> HistoryResult<()>;

    /// Remove the document stored under `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> HistoryResult<()>;
}

impl<B: HistoryBackend + ?Sized> HistoryBackend for Box<B> {
    fn read(&self, key: &str) -> HistoryResult<Option<String>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> HistoryResult<()> {
        (**self).write(key, value)
    }

    fn remove(&self, key: &str) -> HistoryResult<()> {
        (**self).remove(key)
    }
}

/// Storage key for a clinician's history.
pub fn storage_key(user: &ClinicianId) -> String {
    format!("{}{}", STORAGE_KEY_PREFIX, user.as_str())
}

/// Dashboard counters for one clinician's history.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistorySummary {
    /// Number of records
    pub total: usize,
    /// Records with a positive label
    pub positive: usize,
    /// Records with a negative label
    pub negative: usize,
    /// Date of the newest record
    pub latest: Option<DateTime<Utc>>,
}

impl HistorySummary {
    fn from_records(records: &[DiagnosticRecord]) -> Self {
        let positive = records.iter().filter(|r| r.is_positive()).count();
        Self {
            total: records.len(),
            positive,
            negative: records.len() - positive,
            latest: records.first().map(|r| r.date),
        }
    }
}

/// Per-clinician record history over a pluggable backend.
pub struct HistoryStore<B: HistoryBackend> {
    backend: B,
}

impl<B: HistoryBackend> HistoryStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Records for `user`, newest first.
    ///
    /// Missing, unreadable or corrupt data yields an empty history.
    pub fn load(&self, user: &ClinicianId) -> Vec<DiagnosticRecord> {
        match self.try_load(user) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(clinician = %user, error = %e, "history unreadable, treating as empty");
                Vec::new()
            }
        }
    }

    /// Records for `user`, surfacing read and decode failures.
    pub fn try_load(&self, user: &ClinicianId) -> HistoryResult<Vec<DiagnosticRecord>> {
        match self.backend.read(&storage_key(user))? {
            Some(payload) => Ok(serde_json::from_str(&payload)?),
            None => Ok(Vec::new()),
        }
    }

    /// Prepend `record` to `user`'s history and persist the whole sequence.
    ///
    /// Returns the updated sequence. A failed read or write leaves the stored
    /// history untouched and is returned to the caller. Only a document that
    /// no longer decodes is replaced.
    pub fn append(
        &self,
        user: &ClinicianId,
        record: DiagnosticRecord,
    ) -> HistoryResult<Vec<DiagnosticRecord>> {
        let mut records = match self.try_load(user) {
            Ok(records) => records,
            Err(HistoryError::Json(e)) => {
                tracing::warn!(clinician = %user, error = %e, "corrupt history replaced");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        let record_id = record.id.clone();
        records.insert(0, record);

        let payload = serde_json::to_string(&records)?;
        self.backend.write(&storage_key(user), &payload)?;

        tracing::info!(
            clinician = %user,
            record_id = %record_id,
            total = records.len(),
            "diagnostic record saved"
        );
        Ok(records)
    }

    /// Discard every record of `user`. Irreversible.
    pub fn clear(&self, user: &ClinicianId) -> HistoryResult<()> {
        self.backend.remove(&storage_key(user))?;
        tracing::info!(clinician = %user, "diagnostic history cleared");
        Ok(())
    }

    /// One record of `user` by id.
    pub fn get(&self, user: &ClinicianId, id: &str) -> Option<DiagnosticRecord> {
        self.load(user).into_iter().find(|r| r.id == id)
    }

    /// Counters for `user`'s history.
    pub fn summary(&self, user: &ClinicianId) -> HistorySummary {
        HistorySummary::from_records(&self.load(user))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::make_record;
    use super::*;

    fn alice() -> ClinicianId {
        ClinicianId::new("alice").unwrap()
    }

    fn bob() -> ClinicianId {
        ClinicianId::new("bob").unwrap()
    }

    #[test]
    fn test_storage_key() {
        assert_eq!(storage_key(&alice()), "diagnostic_history_alice");
    }

    #[test]
    fn test_load_missing_is_empty() {
        let store = HistoryStore::new(MemoryBackend::new());
        assert!(store.load(&alice()).is_empty());
        assert!(store.try_load(&alice()).unwrap().is_empty());
    }

    #[test]
    fn test_append_newest_first() {
        let store = HistoryStore::new(MemoryBackend::new());

        store.append(&alice(), make_record("r1", "alice", 0)).unwrap();
        let updated = store.append(&alice(), make_record("r2", "alice", 1)).unwrap();

        let ids: Vec<_> = updated.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "r1"]);

        let loaded: Vec<_> = store.load(&alice()).into_iter().map(|r| r.id).collect();
        assert_eq!(loaded, vec!["r2", "r1"]);
    }

    #[test]
    fn test_isolation_between_clinicians() {
        let store = HistoryStore::new(MemoryBackend::new());

        store.append(&alice(), make_record("r1", "alice", 0)).unwrap();

        assert!(store.load(&bob()).is_empty());
        assert!(store.get(&bob(), "r1").is_none());

        store.clear(&bob()).unwrap();
        assert_eq!(store.load(&alice()).len(), 1);
    }

    #[test]
    fn test_clear() {
        let store = HistoryStore::new(MemoryBackend::new());

        store.append(&alice(), make_record("r1", "alice", 0)).unwrap();
        store.append(&alice(), make_record("r2", "alice", 0)).unwrap();
        store.clear(&alice()).unwrap();

        assert!(store.load(&alice()).is_empty());
        store.clear(&alice()).unwrap();
    }

    #[test]
    fn test_corrupt_payload_degrades_to_empty() {
        let backend = MemoryBackend::new();
        backend.write("diagnostic_history_alice", "{not json").unwrap();
        let store = HistoryStore::new(backend);

        assert!(store.load(&alice()).is_empty());
        assert!(matches!(store.try_load(&alice()), Err(HistoryError::Json(_))));

        let updated = store.append(&alice(), make_record("r1", "alice", 0)).unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(store.load(&alice()).len(), 1);
    }

    #[test]
    fn test_write_failure_is_surfaced() {
        let store = HistoryStore::new(MemoryBackend::with_quota(64));

        let err = store
            .append(&alice(), make_record("r1", "alice", 0))
            .unwrap_err();
        assert!(matches!(err, HistoryError::QuotaExceeded { limit: 64, .. }));
        assert!(store.load(&alice()).is_empty());
    }

    /// Backend whose reads fail once `fail_reads` is set.
    struct FlakyRead {
        inner: MemoryBackend,
        fail_reads: std::sync::atomic::AtomicBool,
    }

    impl HistoryBackend for FlakyRead {
        fn read(&self, key: &str) -> HistoryResult<Option<String>> {
            if self.fail_reads.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(HistoryError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "database is locked",
                )));
            }
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &str) -> HistoryResult<()> {
            self.inner.write(key, value)
        }

        fn remove(&self, key: &str) -> HistoryResult<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_append_keeps_history_when_read_fails() {
        let store = HistoryStore::new(FlakyRead {
            inner: MemoryBackend::new(),
            fail_reads: std::sync::atomic::AtomicBool::new(false),
        });
        store.append(&alice(), make_record("r1", "alice", 0)).unwrap();
        store.append(&alice(), make_record("r2", "alice", 1)).unwrap();

        store.backend().fail_reads.store(true, std::sync::atomic::Ordering::SeqCst);
        let err = store
            .append(&alice(), make_record("r3", "alice", 0))
            .unwrap_err();
        assert!(matches!(err, HistoryError::Io(_)));
        assert!(store.load(&alice()).is_empty());

        store.backend().fail_reads.store(false, std::sync::atomic::Ordering::SeqCst);
        let ids: Vec<_> = store.load(&alice()).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["r2", "r1"]);
    }

    #[test]
    fn test_get_and_summary() {
        let store = HistoryStore::new(MemoryBackend::new());

        store.append(&alice(), make_record("r1", "alice", 0)).unwrap();
        store.append(&alice(), make_record("r22", "alice", 1)).unwrap();
        store.append(&alice(), make_record("r333", "alice", 1)).unwrap();

        assert_eq!(store.get(&alice(), "r22").unwrap().result.label, 1);
        assert!(store.get(&alice(), "missing").is_none());

        let summary = store.summary(&alice());
        assert_eq!(summary.total, 3);
        assert_eq!(summary.positive, 2);
        assert_eq!(summary.negative, 1);
        assert_eq!(summary.latest, Some(store.load(&alice())[0].date));

        assert_eq!(store.summary(&bob()), HistorySummary::default());
    }

    #[test]
    fn test_boxed_backend() {
        let store: HistoryStore<Box<dyn HistoryBackend>> =
            HistoryStore::new(Box::new(MemoryBackend::new()));
        store.append(&alice(), make_record("r1", "alice", 0)).unwrap();
        assert_eq!(store.load(&alice()).len(), 1);
    }
}
