//! Mock scheduled-task runner for testing.

use std::sync::{Arc, Mutex};

use super::lock;
use crate::scheduler::{Access, TaskError, TaskRunner};
use crate::store::OptionStore;

/// Mock implementation of the TaskRunner trait.
///
/// Counts runs, records the privilege level seen by each run and can read an
/// option at run time, which shows what other invocations would observe
/// while the tasks execute.
#[derive(Default)]
pub struct MockTaskRunner {
    runs: Mutex<usize>,
    superuser: Mutex<Vec<bool>>,
    next_error: Mutex<Option<String>>,
    observed: Mutex<Option<(Arc<dyn OptionStore>, String)>>,
    observed_values: Mutex<Vec<Option<String>>>,
}

impl MockTaskRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_count(&self) -> usize {
        *lock(&self.runs)
    }

    /// Every subsequent run fails with `message`.
    pub fn fail_with(&self, message: &str) {
        *lock(&self.next_error) = Some(message.to_string());
    }

    /// Read `name` from `store` at the start of every run.
    pub fn observe_option(&self, store: Arc<dyn OptionStore>, name: &str) {
        *lock(&self.observed) = Some((store, name.to_string()));
    }

    pub fn observed_values(&self) -> Vec<Option<String>> {
        lock(&self.observed_values).clone()
    }

    /// Whether the access level was elevated, per run.
    pub fn superuser_during_runs(&self) -> Vec<bool> {
        lock(&self.superuser).clone()
    }
}

impl TaskRunner for MockTaskRunner {
    fn run_scheduled_tasks(&self, access: &Access) -> Result<(), TaskError> {
        *lock(&self.runs) += 1;
        lock(&self.superuser).push(access.is_superuser());

        if let Some((store, name)) = lock(&self.observed).as_ref() {
            let value = store.get_option(name)?;
            lock(&self.observed_values).push(value);
        }

        match lock(&self.next_error).as_ref() {
            Some(message) => Err(TaskError::Failed {
                task: "mock".to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}
