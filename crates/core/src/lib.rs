pub mod auth;
pub mod config;
pub mod metrics;
pub mod plugins;
pub mod scheduler;
pub mod store;
pub mod testing;
pub mod tracker;
pub mod visit;

pub use auth::{
    create_authenticator, AuthError, NoneAuthenticator, SiteAuthenticator, SqliteAuthenticator,
    TokenAuthenticator,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use plugins::{PluginError, PluginRegistry, TrackerPlugin};
pub use scheduler::{
    Access, GateDecision, OptimizeDatabaseTask, ScheduledTask, ScheduledTaskGate, TaskError,
    TaskRegistry, TaskRunner,
};
pub use store::{OptionStore, SqliteOptionStore, SqliteSiteStore, StoreError};
pub use tracker::{
    BatchMode, BatchOutcome, DbError, PipelineState, RawInput, Tracker, TrackerError,
    TrackerResponse,
};
pub use visit::{SiteVisitHandler, Visit, VisitError, VisitHandler};
