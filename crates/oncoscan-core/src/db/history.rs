//! Diagnostic history database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};

impl Database {
    /// Read the serialized history stored under `key`.
    pub fn read_history(&self, key: &str) -> DbResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT payload FROM diagnostic_history WHERE storage_key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Replace the serialized history under `key` in a single statement.
    pub fn write_history(&self, key: &str, payload: &str, record_count: usize) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO diagnostic_history (storage_key, payload, record_count, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(storage_key) DO UPDATE SET
                payload = excluded.payload,
                record_count = excluded.record_count,
                updated_at = excluded.updated_at
            "#,
            params![key, payload, record_count as i64],
        )?;
        Ok(())
    }

    /// Delete the history under `key`.
    pub fn delete_history(&self, key: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM diagnostic_history WHERE storage_key = ?", [key])?;
        Ok(rows_affected > 0)
    }

    /// Number of records stored under `key`, without decoding the payload.
    pub fn history_record_count(&self, key: &str) -> DbResult<usize> {
        let count: Option<i64> = self
            .conn
            .query_row(
                "SELECT record_count FROM diagnostic_history WHERE storage_key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0) as usize)
    }
}
