use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{initialize_schema, StoreError};
use crate::tracker::DbError;

/// Key/value store shared by every tracker invocation.
///
/// Reads and writes are independent; there is no compare-and-swap, so two
/// writers racing on the same key both succeed and the last one wins.
pub trait OptionStore: Send + Sync {
    /// Read an option, `None` when it was never set.
    fn get_option(&self, name: &str) -> Result<Option<String>, StoreError>;

    /// Insert or overwrite an option.
    fn set_option(&self, name: &str, value: &str) -> Result<(), StoreError>;
}

/// SQLite-backed option store.
pub struct SqliteOptionStore {
    conn: Mutex<Connection>,
}

impl SqliteOptionStore {
    /// Open the option store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.into()))?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory option store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Database(e.into()))?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database(DbError::new(None, "option store connection poisoned")))
    }
}

impl OptionStore for SqliteOptionStore {
    fn get_option(&self, name: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT value FROM option WHERE name = ?",
            params![name],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StoreError::Database(e.into()))
    }

    fn set_option(&self, name: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO option (name, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![name, value, Utc::now().to_rfc3339()],
        )
        .map_err(|e| StoreError::Database(e.into()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_option() {
        let store = SqliteOptionStore::in_memory().unwrap();
        assert_eq!(store.get_option("lastTrackerCronRun").unwrap(), None);
    }

    #[test]
    fn test_set_then_overwrite() {
        let store = SqliteOptionStore::in_memory().unwrap();
        store.set_option("lastTrackerCronRun", "100").unwrap();
        assert_eq!(
            store.get_option("lastTrackerCronRun").unwrap(),
            Some("100".to_string())
        );

        store.set_option("lastTrackerCronRun", "200").unwrap();
        assert_eq!(
            store.get_option("lastTrackerCronRun").unwrap(),
            Some("200".to_string())
        );
    }

    #[test]
    fn test_options_shared_across_connections() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("options.db");

        let first = SqliteOptionStore::new(&db_path).unwrap();
        let second = SqliteOptionStore::new(&db_path).unwrap();

        first.set_option("enableBrowserTriggerArchiving", "0").unwrap();
        assert_eq!(
            second.get_option("enableBrowserTriggerArchiving").unwrap(),
            Some("0".to_string())
        );
    }
}
