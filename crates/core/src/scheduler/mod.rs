//! Scheduled maintenance triggered by tracker traffic.

mod access;
mod gate;
mod runner;

pub use access::{Access, SuperUserGuard};
pub use gate::{GateDecision, ScheduledTaskGate, BROWSER_TRIGGER_OPTION, LAST_RUN_OPTION};
pub use runner::{OptimizeDatabaseTask, ScheduledTask, TaskRegistry, TaskRunner};

use thiserror::Error;

use crate::store::StoreError;
use crate::tracker::{DbError, TrackerError};

/// Error type for scheduled-task evaluation and execution.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Scheduled task lock unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Task {0} requires super user access")]
    PermissionDenied(String),

    #[error("Task {task} failed: {message}")]
    Failed { task: String, message: String },

    #[error("Task {task} failed: {source}")]
    Database {
        task: String,
        #[source]
        source: DbError,
    },
}

impl From<TaskError> for TrackerError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::Store(StoreError::Database(db)) | TaskError::Database { source: db, .. } => {
                TrackerError::Db(db)
            }
            other => TrackerError::Processing(other.to_string()),
        }
    }
}
