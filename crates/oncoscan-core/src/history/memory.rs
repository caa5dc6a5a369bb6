//! In-memory history backend.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{HistoryBackend, HistoryError, HistoryResult};

/// Process-local backend.
///
/// An optional byte quota makes writes fail the way a full browser storage
/// area would.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend refusing to hold more than `quota` bytes in total.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HistoryBackend for MemoryBackend {
    fn read(&self, key: &str) -> HistoryResult<Option<String>> {
        Ok(self.entries.lock()?.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> HistoryResult<()> {
        let mut entries = self.entries.lock()?;

        if let Some(limit) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > limit {
                return Err(HistoryError::QuotaExceeded { needed, limit });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> HistoryResult<()> {
        self.entries.lock()?.remove(key);
        Ok(())
    }
}
