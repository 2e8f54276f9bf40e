use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hitgate_core::{
    create_authenticator, load_config, store::Site, validate_config, OptimizeDatabaseTask,
    OptionStore, SiteAuthenticator, SqliteOptionStore, SqliteSiteStore, TaskRegistry, TaskRunner,
    Tracker,
};
use hitgate_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("HITGATE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        "Configuration loaded successfully"
    );
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    // Site registry, seeded from the config
    let sites = Arc::new(
        SqliteSiteStore::new(&config.database.path).context("Failed to open site store")?,
    );
    for site in &config.sites {
        sites
            .upsert_site(&Site::from(site))
            .with_context(|| format!("Failed to register site {}", site.id))?;
    }
    info!("Registered {} site(s)", config.sites.len());

    // Create authenticator
    let authenticator: Arc<dyn SiteAuthenticator> = Arc::from(
        create_authenticator(&config.auth, Arc::clone(&sites))
            .context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    // Option store backing the scheduled-task gate
    let options: Arc<dyn OptionStore> = Arc::new(
        SqliteOptionStore::new(&config.database.path).context("Failed to open option store")?,
    );

    // Maintenance tasks run by the gate
    let tasks = TaskRegistry::new().with_task(Box::new(OptimizeDatabaseTask::new(
        config.database.path.clone(),
    )));
    info!("Scheduled tasks: {:?}", tasks.task_names());
    let runner: Arc<dyn TaskRunner> = Arc::new(tasks);

    let tracker = Arc::new(Tracker::new(&config, authenticator, options, runner));

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, tracker));
    let app = create_router(state);

    // Start server
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
