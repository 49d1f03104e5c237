//! Router configuration for the status API.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the router with the four runner routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(handlers::runner_status))
        .route("/history", get(handlers::runner_history))
        .route("/start", post(handlers::start_runner))
        .route("/stop", post(handlers::stop_runner))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
