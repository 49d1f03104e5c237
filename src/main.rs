//! novelacquire - web novel crawling and archiving system.
//!
//! A tool for downloading, storing, and archiving web novels from
//! supported sites, with scheduled cleanup of the output directory.

mod cli;
mod config;
mod models;
mod repository;
mod schema;
mod scrapers;
mod server;
mod services;
mod storage;
mod utils;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging() {
    // RUST_LOG wins; -v raises the default level before clap has parsed.
    let default_filter = if cli::is_verbose() {
        "novelacquire=debug"
    } else {
        "novelacquire=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_logging();
    cli::run().await
}
