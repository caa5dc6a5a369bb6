//! SQLite schema definition.

/// Complete database schema for oncoscan.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Diagnostic History (one document per clinician key)
-- ============================================================================

CREATE TABLE IF NOT EXISTS diagnostic_history (
    storage_key TEXT PRIMARY KEY,
    payload TEXT NOT NULL DEFAULT '[]',          -- JSON array of DiagnosticRecord, newest first
    record_count INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_history_updated ON diagnostic_history(updated_at);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_storage_key_unique() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO diagnostic_history (storage_key, payload) VALUES (?, ?)",
            ["diagnostic_history_alice", "[]"],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO diagnostic_history (storage_key, payload) VALUES (?, ?)",
            ["diagnostic_history_alice", "[]"],
        );
        assert!(result.is_err());
    }
}
