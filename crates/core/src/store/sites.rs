//! Site registry and token access table.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use super::{initialize_schema, StoreError};
use crate::tracker::DbError;
use crate::config::SiteConfig;

/// A tracked website.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub id: u64,
    pub name: String,
    pub main_url: Option<String>,
}

impl From<&SiteConfig> for Site {
    fn from(config: &SiteConfig) -> Self {
        Self {
            id: config.id,
            name: config.name.clone(),
            main_url: config.main_url.clone(),
        }
    }
}

/// Access a login holds on one site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    View,
    Admin,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::View => "view",
            AccessLevel::Admin => "admin",
        }
    }
}

impl FromStr for AccessLevel {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(AccessLevel::View),
            "admin" => Ok(AccessLevel::Admin),
            other => Err(StoreError::InvalidValue {
                key: "access".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Tokens are never stored in clear.
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// SQLite-backed site registry.
pub struct SqliteSiteStore {
    conn: Mutex<Connection>,
}

impl SqliteSiteStore {
    /// Open the registry, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.into()))?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory registry (useful for testing).
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
            .map_err(|_| StoreError::Database(DbError::new(None, "site store connection poisoned")))
    }

    /// Insert a site or update its name and URL.
    pub fn upsert_site(&self, site: &Site) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO site (idsite, name, main_url) VALUES (?1, ?2, ?3)
             ON CONFLICT(idsite) DO UPDATE SET name = excluded.name, main_url = excluded.main_url",
            params![site.id as i64, site.name, site.main_url],
        )
        .map_err(|e| StoreError::Database(e.into()))?;
        Ok(())
    }

    pub fn get_site(&self, id: u64) -> Result<Option<Site>, StoreError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT idsite, name, main_url FROM site WHERE idsite = ?",
            params![id as i64],
            |row| {
                Ok(Site {
                    id: row.get::<_, i64>(0)? as u64,
                    name: row.get(1)?,
                    main_url: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(|e| StoreError::Database(e.into()))
    }

    /// Register a token for a login. The clear token is hashed before storage.
    pub fn add_token(&self, login: &str, token: &str, superuser: bool) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO user_token (token_hash, login, superuser) VALUES (?1, ?2, ?3)",
            params![hash_token(token), login, superuser],
        )
        .map_err(|e| StoreError::Database(e.into()))?;
        Ok(())
    }

    pub fn grant_access(
        &self,
        login: &str,
        id_site: u64,
        level: AccessLevel,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO access (login, idsite, access) VALUES (?1, ?2, ?3)",
            params![login, id_site as i64, level.as_str()],
        )
        .map_err(|e| StoreError::Database(e.into()))?;
        Ok(())
    }

    /// True when the token belongs to a super user, or to a login with admin
    /// access on the site.
    pub fn has_admin_access(&self, token: &str, id_site: u64) -> Result<bool, StoreError> {
        let conn = self.conn()?;

        let owner: Option<(String, bool)> = conn
            .query_row(
                "SELECT login, superuser FROM user_token WHERE token_hash = ?",
                params![hash_token(token)],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| StoreError::Database(e.into()))?;

        let Some((login, superuser)) = owner else {
            return Ok(false);
        };
        if superuser {
            return Ok(true);
        }

        let access: Option<String> = conn
            .query_row(
                "SELECT access FROM access WHERE login = ?1 AND idsite = ?2",
                params![login, id_site as i64],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Database(e.into()))?;

        match access {
            Some(level) => Ok(level.parse::<AccessLevel>()? == AccessLevel::Admin),
            None => Ok(false),
        }
    }
}
