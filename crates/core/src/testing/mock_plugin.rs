//! Mock tracker plugin for testing.

use std::sync::{Arc, Mutex};

use super::lock;
use crate::config::DatabaseConfig;
use crate::plugins::{PluginError, TrackerPlugin};
use crate::tracker::TrackerRequest;
use crate::visit::VisitHandler;

/// Mock implementation of the TrackerPlugin trait.
pub struct MockPlugin {
    name: String,
    prepare_error: Option<String>,
    busy_timeout_ms: Option<u64>,
    handler: Option<Arc<dyn VisitHandler>>,
    prepared: Mutex<usize>,
}

impl MockPlugin {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            prepare_error: None,
            busy_timeout_ms: None,
            handler: None,
            prepared: Mutex::new(0),
        }
    }

    /// `prepare` fails with `message`.
    pub fn failing_prepare(mut self, message: &str) -> Self {
        self.prepare_error = Some(message.to_string());
        self
    }

    /// Override the database busy timeout.
    pub fn with_busy_timeout(mut self, ms: u64) -> Self {
        self.busy_timeout_ms = Some(ms);
        self
    }

    /// Substitute `handler` for the default visit handler.
    pub fn with_visit_handler(mut self, handler: Arc<dyn VisitHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Number of `prepare` calls.
    pub fn prepare_count(&self) -> usize {
        *lock(&self.prepared)
    }
}

impl TrackerPlugin for MockPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure_database(&self, config: &mut DatabaseConfig) {
        if let Some(ms) = self.busy_timeout_ms {
            config.busy_timeout_ms = ms;
        }
    }

    fn visit_handler(&self) -> Option<Arc<dyn VisitHandler>> {
        self.handler.clone()
    }

    fn prepare(&self, _request: &TrackerRequest) -> Result<(), PluginError> {
        *lock(&self.prepared) += 1;
        match &self.prepare_error {
            Some(message) => Err(PluginError::new(&self.name, message.as_str())),
            None => Ok(()),
        }
    }
}
