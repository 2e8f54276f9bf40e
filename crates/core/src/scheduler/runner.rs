use std::path::PathBuf;
use std::time::Duration;

use rusqlite::Connection;
use tracing::{error, info};

use super::{Access, TaskError};
use crate::tracker::DbError;

/// Executes the periodic maintenance work once the gate opens.
pub trait TaskRunner: Send + Sync {
    /// Run every scheduled task. Called with `access` already elevated.
    fn run_scheduled_tasks(&self, access: &Access) -> Result<(), TaskError>;
}

/// One named maintenance task.
pub trait ScheduledTask: Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, access: &Access) -> Result<(), TaskError>;
}

/// Runner executing registered tasks in registration order.
///
/// A failing task does not stop the ones after it; the first failure is
/// reported once all tasks ran.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: Vec<Box<dyn ScheduledTask>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task: Box<dyn ScheduledTask>) {
        self.tasks.push(task);
    }

    pub fn with_task(mut self, task: Box<dyn ScheduledTask>) -> Self {
        self.register(task);
        self
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }
}

impl TaskRunner for TaskRegistry {
    fn run_scheduled_tasks(&self, access: &Access) -> Result<(), TaskError> {
        let mut first_error = None;
        for task in &self.tasks {
            match task.run(access) {
                Ok(()) => info!(task = task.name(), "Scheduled task completed"),
                Err(e) => {
                    error!(task = task.name(), error = %e, "Scheduled task failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Lets SQLite refresh its query planner statistics.
pub struct OptimizeDatabaseTask {
    path: PathBuf,
}

impl OptimizeDatabaseTask {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ScheduledTask for OptimizeDatabaseTask {
    fn name(&self) -> &str {
        "optimize_database"
    }

    fn run(&self, access: &Access) -> Result<(), TaskError> {
        if !access.is_superuser() {
            return Err(TaskError::PermissionDenied(self.name().to_string()));
        }
        let failed = |e: rusqlite::Error| TaskError::Database {
            task: self.name().to_string(),
            source: DbError::from(e),
        };
        let conn = Connection::open(&self.path).map_err(failed)?;
        conn.busy_timeout(Duration::from_secs(5)).map_err(failed)?;
        conn.execute_batch("PRAGMA optimize;").map_err(failed)?;
        Ok(())
    }
}
