//! Status server exposing the cleanup scheduler over HTTP.
//!
//! Four routes, no more: runner status, run history, start and stop.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::time::Duration;

use crate::config::Settings;
use crate::services::{CleanupService, Scheduler};

/// Shared state for the status server.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Scheduler,
}

impl AppState {
    pub fn new(settings: &Settings) -> Self {
        let db = settings.create_db_context();
        let scheduler = Scheduler::new(
            CleanupService::new(db, settings.clone()),
            Duration::from_secs(settings.sweep_interval_secs),
        );
        Self { scheduler }
    }
}

/// Start the status server. The scheduler starts alongside it; the stop
/// route pauses sweeps without taking the server down.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings);
    state.scheduler.start().await;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting status server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
