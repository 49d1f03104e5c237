//! Request handlers for the status API.
//!
//! Nothing but delegation to the scheduler lives here.

use axum::extract::State;
use axum::Json;

use super::AppState;
use crate::models::RunnerHistory;

/// `GET /status`
pub async fn runner_status(State(state): State<AppState>) -> Json<bool> {
    Json(state.scheduler.is_running().await)
}

/// `GET /history`
pub async fn runner_history(State(state): State<AppState>) -> Json<RunnerHistory> {
    Json(state.scheduler.history().await)
}

/// `POST /start`
pub async fn start_runner(State(state): State<AppState>) -> Json<bool> {
    state.scheduler.start().await;
    Json(true)
}

/// `POST /stop`
pub async fn stop_runner(State(state): State<AppState>) -> Json<bool> {
    state.scheduler.stop().await;
    Json(true)
}
