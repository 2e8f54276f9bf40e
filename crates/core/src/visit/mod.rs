//! The per-visit processing contract.
//!
//! Matching a hit to a visitor and persisting it is done by a [`VisitHandler`].
//! The pipeline only prepares the request, the forced overrides and the
//! database connection, then calls `handle` once per valid item.

mod site;

pub use site::SiteVisitHandler;

use rusqlite::Connection;
use thiserror::Error;

use crate::tracker::{DbError, ForcedOverrides, TrackerError, TrackerRequest};

/// Everything a handler gets for one hit.
pub struct Visit<'a> {
    pub request: &'a TrackerRequest,
    /// Overrides forced by an authenticated caller, cleared after this call.
    pub overrides: ForcedOverrides,
    /// The batch connection, opened on first use.
    pub db: &'a Connection,
}

#[derive(Debug, Error)]
pub enum VisitError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error("{0}")]
    Processing(String),
}

impl From<rusqlite::Error> for VisitError {
    fn from(err: rusqlite::Error) -> Self {
        VisitError::Database(err.into())
    }
}

impl From<VisitError> for TrackerError {
    fn from(err: VisitError) -> Self {
        match err {
            VisitError::Database(db) => TrackerError::Db(db),
            VisitError::Processing(message) => TrackerError::Processing(message),
        }
    }
}

/// Records one hit.
pub trait VisitHandler: Send + Sync {
    /// Handler name, for logs.
    fn name(&self) -> &'static str;

    fn handle(&self, visit: &Visit<'_>) -> Result<(), VisitError>;
}
