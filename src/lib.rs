//! novelacquire - web novel crawling and archiving system.
//!
//! Crawls novel sites through a lightweight HTTP tier with a real-browser
//! fallback, stores chapters and images under an output directory, and
//! keeps that directory within a size budget via scheduled cleanup sweeps.

pub mod cli;
pub mod config;
pub mod models;
pub mod repository;
pub mod schema;
pub mod scrapers;
pub mod server;
pub mod services;
pub mod storage;
pub mod utils;
