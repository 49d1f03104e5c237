//! Command-line parser and per-command dispatch.

mod cleanup;
mod crawl;
mod info;
mod search;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "novel")]
#[command(about = "Web novel crawling and archiving system")]
#[command(version)]
pub struct Cli {
    /// Data directory or catalog database to operate on.
    /// Either a directory holding novelacquire.db or a .db file itself.
    #[arg(long, short = 't', global = true)]
    target: Option<PathBuf>,

    /// Explicit config file (skips discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative config paths against the current directory
    #[arg(long, global = true)]
    cwd: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Scan argv for -v/--verbose before clap has run, so logging can be
/// initialized first.
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Search a site's catalog for novels
    Search {
        /// Search query
        query: String,
        /// Site to search (e.g. foxaholic)
        #[arg(short, long)]
        site: String,
        /// Limit number of results
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show novel metadata and chapter list without downloading
    Info {
        /// Novel page URL
        url: String,
    },

    /// Download a novel: metadata, chapters, and images
    Crawl {
        /// Novel page URL
        url: String,
    },

    /// Start the status server and the cleanup scheduler
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default: 127.0.0.1:3030)
        #[arg(default_value = "127.0.0.1:3030")]
        bind: String,
    },

    /// Run one cleanup sweep and exit
    Cleanup,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
        target: cli.target,
    };
    let (settings, _config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Search { query, site, limit } => {
            search::cmd_search(&settings, &query, &site, limit).await
        }
        Commands::Info { url } => info::cmd_info(&settings, &url).await,
        Commands::Crawl { url } => crawl::cmd_crawl(&settings, &url).await,
        Commands::Serve { bind } => serve::cmd_serve(&settings, &bind).await,
        Commands::Cleanup => cleanup::cmd_cleanup(&settings).await,
    }
}
