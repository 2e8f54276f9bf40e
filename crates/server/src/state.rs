use std::sync::Arc;

use hitgate_core::{Config, SanitizedConfig, Tracker};

/// Shared application state
pub struct AppState {
    config: Config,
    tracker: Arc<Tracker>,
}

impl AppState {
    pub fn new(config: Config, tracker: Arc<Tracker>) -> Self {
        Self { config, tracker }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// The tracker pipeline, cloned for use on a blocking thread.
    pub fn tracker(&self) -> Arc<Tracker> {
        Arc::clone(&self.tracker)
    }
}
