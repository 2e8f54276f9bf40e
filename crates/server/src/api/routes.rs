use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use super::{handlers, middleware::metrics_middleware, track};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.config().server.max_body_bytes;

    // API routes
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config));

    // Tracker endpoints (same pipeline under every historical name)
    let tracker_routes = Router::new()
        .route("/track", get(track::track).post(track::track))
        .route("/piwik.php", get(track::track).post(track::track))
        .route("/matomo.php", get(track::track).post(track::track))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes));

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(tracker_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
