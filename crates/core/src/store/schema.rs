use rusqlite::Connection;

use super::StoreError;

/// Create the tables shared by the tracker stores if they are missing.
pub fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS option (
            name TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS site (
            idsite INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            main_url TEXT
        );

        CREATE TABLE IF NOT EXISTS user_token (
            token_hash TEXT PRIMARY KEY,
            login TEXT NOT NULL,
            superuser INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS access (
            login TEXT NOT NULL,
            idsite INTEGER NOT NULL,
            access TEXT NOT NULL,
            PRIMARY KEY (login, idsite)
        );

        CREATE INDEX IF NOT EXISTS idx_user_token_login ON user_token(login);
        "#,
    )
    .map_err(|e| StoreError::Database(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('option', 'site', 'user_token', 'access')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 4);
    }
}
