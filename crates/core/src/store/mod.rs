//! SQLite-backed shared state.
//!
//! Everything that must be visible across concurrent tracker invocations
//! lives here: the option table (which holds the scheduled-task lock) and
//! the site/token/access registry the authenticators read.

mod options;
mod schema;
mod sites;

pub use options::{OptionStore, SqliteOptionStore};
pub use schema::initialize_schema;
pub use sites::{hash_token, AccessLevel, Site, SqliteSiteStore};

use thiserror::Error;

use crate::tracker::DbError;

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(DbError),

    #[error("Invalid stored value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
