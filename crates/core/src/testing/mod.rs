//! Testing utilities and mock implementations of the tracker collaborators.
//!
//! Every external seam of the pipeline has a recording mock here, so the
//! pipeline can be exercised end to end without a real access-control
//! backend, visit engine or maintenance jobs.
//!
//! # Example
//!
//! ```rust,ignore
//! use hitgate_core::testing::{MemoryOptionStore, MockAuthenticator, MockTaskRunner, MockVisitHandler};
//!
//! let auth = Arc::new(MockAuthenticator::allow_all());
//! let visits = Arc::new(MockVisitHandler::new());
//! let tracker = Tracker::new(&config, auth.clone(), Arc::new(MemoryOptionStore::new()), Arc::new(MockTaskRunner::new()))
//!     .with_visit_handler(visits.clone());
//!
//! tracker.main(&RawInput::get("idsite=1&rec=1"));
//! assert_eq!(visits.visit_count(), 1);
//! ```

mod mock_authenticator;
mod mock_option_store;
mod mock_plugin;
mod mock_task_runner;
mod mock_visit_handler;

pub use mock_authenticator::MockAuthenticator;
pub use mock_option_store::MemoryOptionStore;
pub use mock_plugin::MockPlugin;
pub use mock_task_runner::MockTaskRunner;
pub use mock_visit_handler::{MockVisitHandler, RecordedVisit};

use std::sync::{Mutex, MutexGuard};

/// Lock a mock's state, recovering it if a panicking test poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::config::{AuthConfig, AuthMethod, Config, DatabaseConfig, SiteConfig};
    use crate::store::{Site, SqliteSiteStore};
    use crate::tracker::Params;

    /// A config with token auth, a database at `db_path` and sites 1 and 2.
    pub fn config(db_path: &Path) -> Config {
        Config {
            auth: AuthConfig {
                method: AuthMethod::Token,
                token: Some("T".to_string()),
            },
            server: Default::default(),
            database: DatabaseConfig {
                path: db_path.to_path_buf(),
                busy_timeout_ms: 1000,
            },
            tracker: Default::default(),
            general: Default::default(),
            sites: vec![site(1, "Blog"), site(2, "Shop")],
        }
    }

    pub fn site(id: u64, name: &str) -> SiteConfig {
        SiteConfig {
            id,
            name: name.to_string(),
            main_url: Some(format!("https://{}.example", name.to_lowercase())),
        }
    }

    /// Create the database at `db_path` and register the configured sites.
    pub fn seed_sites(config: &Config) -> SqliteSiteStore {
        let store = SqliteSiteStore::new(&config.database.path).expect("open site store");
        for site in &config.sites {
            store.upsert_site(&Site::from(site)).expect("seed site");
        }
        store
    }

    /// Build a parameter map from pairs.
    pub fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}
