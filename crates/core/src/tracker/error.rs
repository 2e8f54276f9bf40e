//! Error taxonomy of the tracker pipeline.

use rusqlite::ErrorCode;
use thiserror::Error;

use crate::auth::AuthError;

/// Shown instead of any access-denied database error, so user and schema
/// names never reach a response.
pub const DB_CREDENTIALS_MESSAGE: &str =
    "Error while connecting to the tracker database - please check your database credentials in the configuration file";

/// Driver codes of the access-denied class (MySQL 1044, SQLSTATE 42000).
const ACCESS_DENIED_CODES: [i64; 2] = [1044, 42000];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    AccessDenied,
    Other,
}

/// Connection or query failure.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DbError {
    kind: DbErrorKind,
    code: Option<i64>,
    message: String,
}

impl DbError {
    /// Build an error from a driver code, classifying access-denied codes.
    pub fn new(code: Option<i64>, message: impl Into<String>) -> Self {
        let kind = match code {
            Some(c) if ACCESS_DENIED_CODES.contains(&c) => DbErrorKind::AccessDenied,
            _ => DbErrorKind::Other,
        };
        Self {
            kind,
            code,
            message: message.into(),
        }
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self {
            kind: DbErrorKind::AccessDenied,
            code: None,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> DbErrorKind {
        self.kind
    }

    pub fn code(&self) -> Option<i64> {
        self.code
    }

    pub fn is_access_denied(&self) -> bool {
        self.kind == DbErrorKind::AccessDenied
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(ffi, _) => {
                let kind = match ffi.code {
                    ErrorCode::CannotOpen
                    | ErrorCode::PermissionDenied
                    | ErrorCode::AuthorizationForStatementDenied => DbErrorKind::AccessDenied,
                    _ => DbErrorKind::Other,
                };
                Self {
                    kind,
                    code: Some(i64::from(ffi.extended_code)),
                    message: err.to_string(),
                }
            }
            _ => Self::new(None, err.to_string()),
        }
    }
}

/// Everything that can end a batch or one of its items.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Malformed bulk body.
    #[error("Failed to decode bulk tracking request: {0}")]
    Parse(String),

    /// Missing token or refused site.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Connection or query failure.
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    /// Any other delegate, plugin or maintenance failure.
    #[error("{0}")]
    Processing(String),
}

impl TrackerError {
    /// Message safe to put in a response body once disclosure is allowed.
    pub fn public_message(&self) -> String {
        match self {
            TrackerError::Db(db) if db.is_access_denied() => DB_CREDENTIALS_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TrackerError::Parse(_) => "parse",
            TrackerError::Auth(_) => "auth",
            TrackerError::Db(_) => "db",
            TrackerError::Processing(_) => "processing",
        }
    }

    /// Parse and auth errors are raised before any item is processed.
    pub fn is_intake(&self) -> bool {
        matches!(self, TrackerError::Parse(_) | TrackerError::Auth(_))
    }
}
