//! Per-batch database handle.

use std::time::Duration;

use rusqlite::Connection;
use tracing::debug;

use super::DbError;
use crate::config::DatabaseConfig;

/// Connection opened on first use and held until the batch ends.
#[derive(Default)]
pub struct LazyDb {
    conn: Option<Connection>,
    opened: usize,
}

impl LazyDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the open connection, opening it with `config()` if needed.
    ///
    /// The config closure is only evaluated when a connection is opened, so
    /// plugin-adjusted settings are read at first use.
    pub fn connection<F>(&mut self, config: F) -> Result<&Connection, DbError>
    where
        F: FnOnce() -> DatabaseConfig,
    {
        if self.conn.is_none() {
            let config = config();
            let conn = Connection::open(&config.path)?;
            conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
            debug!(path = %config.path.display(), "Opened tracker database");
            self.opened += 1;
            self.conn = Some(conn);
        }
        match self.conn.as_ref() {
            Some(conn) => Ok(conn),
            None => Err(DbError::new(None, "tracker database is not connected")),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Number of connections opened by this handle.
    pub fn opened_count(&self) -> usize {
        self.opened
    }

    /// Release the connection. Safe to call when nothing was opened.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                debug!(error = %e, "Error while closing tracker database");
            } else {
                debug!("Closed tracker database");
            }
        }
    }
}

impl Drop for LazyDb {
    fn drop(&mut self) {
        self.close();
    }
}
