//! SQLite history backend.

use std::path::Path;
use std::sync::Mutex;

use super::{HistoryBackend, HistoryResult};
use crate::db::{Database, DbResult};

/// Backend storing each history as one row of an SQLite database.
///
/// Each write is a single upsert, so readers see either the previous or the
/// new document.
pub struct SqliteBackend {
    db: Mutex<Database>,
}

impl SqliteBackend {
    /// Open or create the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Ok(Self::from_database(Database::open(path)?))
    }

    /// In-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    pub fn from_database(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }
}

impl HistoryBackend for SqliteBackend {
    fn read(&self, key: &str) -> HistoryResult<Option<String>> {
        let db = self.db.lock()?;
        Ok(db.read_history(key)?)
    }

    fn write(&self, key: &str, value: &str) -> HistoryResult<()> {
        let record_count = serde_json::from_str::<Vec<serde_json::Value>>(value)
            .map(|v| v.len())
            .unwrap_or(0);
        let db = self.db.lock()?;
        db.write_history(key, value, record_count)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> HistoryResult<()> {
        let db = self.db.lock()?;
        db.delete_history(key)?;
        Ok(())
    }
}
