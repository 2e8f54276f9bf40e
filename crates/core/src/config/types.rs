use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub general: GeneralConfig,
    /// Sites seeded into the site registry at startup
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted request body (bulk imports included)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

fn default_max_body_bytes() -> usize {
    8 * 1024 * 1024
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Super user token (required when method = "token")
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Every token is rejected; bulk import and tracking overrides are unavailable.
    None,
    /// A single configured token with admin access on every site.
    Token,
    /// Hashed tokens with per-site access stored in the database.
    Sqlite,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::None => "none",
            AuthMethod::Token => "token",
            AuthMethod::Sqlite => "sqlite",
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// Milliseconds a connection waits on a locked database
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("hitgate.db")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Tracker pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerConfig {
    /// When false every hit ends in the logging-disabled state.
    #[serde(default = "default_true")]
    pub record_statistics: bool,
    /// Always run in debug mode (diagnostics in responses).
    #[serde(default)]
    pub debug: bool,
    /// Allow `debug=1` in the query string to enable debug mode per request.
    #[serde(default)]
    pub debug_on_demand: bool,
    /// Minimum seconds between two scheduled-task runs; 0 disables the trigger.
    #[serde(default = "default_min_interval")]
    pub scheduled_tasks_min_interval: i64,
    /// Run scheduled tasks on every eligible batch regardless of the interval.
    #[serde(default)]
    pub debug_force_scheduled_tasks: bool,
    /// When false every request may use the tracking overrides.
    #[serde(default = "default_true")]
    pub tracking_requests_require_authentication: bool,
    /// Plugins skipped for authenticated requests carrying `dp=1`.
    #[serde(default = "default_import_excluded_plugins")]
    pub import_excluded_plugins: Vec<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            record_statistics: true,
            debug: false,
            debug_on_demand: false,
            scheduled_tasks_min_interval: default_min_interval(),
            debug_force_scheduled_tasks: false,
            tracking_requests_require_authentication: true,
            import_excluded_plugins: default_import_excluded_plugins(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_min_interval() -> i64 {
    3600
}

fn default_import_excluded_plugins() -> Vec<String> {
    vec!["Provider".to_string()]
}

/// General settings shared with the maintenance side
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Default for the `enableBrowserTriggerArchiving` option when it is unset.
    #[serde(default = "default_true")]
    pub enable_browser_archiving_triggering: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enable_browser_archiving_triggering: true,
        }
    }
}

/// A site known to the tracker
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SiteConfig {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub main_url: Option<String>,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub tracker: TrackerConfig,
    pub general: GeneralConfig,
    pub sites: Vec<SiteConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub token_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: config.auth.method.as_str().to_string(),
                token_configured: config
                    .auth
                    .token
                    .as_ref()
                    .is_some_and(|t| !t.is_empty()),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            tracker: config.tracker.clone(),
            general: config.general.clone(),
            sites: config.sites.clone(),
        }
    }
}
