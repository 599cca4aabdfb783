//! parkwatch - a terminal watcher for town parking availability.
//!
//! Builds the fetcher and refresh scheduler from user settings and drives
//! them until interrupted. Works offline from the last cached snapshot.

mod cli;
mod format;
mod watch;

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use parkwatch_core::{
    CacheManager, ConnectivityFlag, DataFetcher, FeedClient, FileStore, Settings, SystemClock,
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{CacheAction, Cli, Commands};

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "parkwatch.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn load_settings() -> Settings {
    match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            warn!(error = %e, "Failed to load settings, using defaults");
            Settings::default()
        }
    }
}

fn build_fetcher(settings: &Settings, offline: bool) -> Result<Arc<DataFetcher>> {
    let cache_dir = settings.cache_dir()?;
    info!(?cache_dir, "Cache directory configured");

    let client = FeedClient::new(Duration::from_millis(settings.request_timeout_ms))?;
    let store = FileStore::new(cache_dir)?;

    Ok(Arc::new(DataFetcher::new(
        Arc::new(client),
        CacheManager::new(Arc::new(store)),
        Arc::new(ConnectivityFlag::new(!offline)),
        Arc::new(SystemClock),
        settings.fetcher_settings(),
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_deref());
    info!("parkwatch starting");

    let settings = load_settings();
    let fetcher = build_fetcher(&settings, cli.offline)?;

    match cli.command {
        Commands::Watch => watch::watch(fetcher, settings.refresh_interval()).await,
        Commands::Fetch => fetch_once(&fetcher).await?,
        Commands::Cache { action } => match action {
            CacheAction::Status => {
                let status = fetcher.cache_status();
                println!("locations: {}", status.locations_age());
                println!("config:    {}", status.config_age());
            }
            CacheAction::Clear => {
                fetcher.clear_cache()?;
                println!("Cache cleared");
            }
        },
    }

    info!("parkwatch shutting down");
    Ok(())
}

async fn fetch_once(fetcher: &DataFetcher) -> Result<()> {
    let (locations, config) =
        tokio::join!(fetcher.fetch_parking_locations(), fetcher.fetch_app_config());
    let output = serde_json::json!({
        "config": config,
        "locations": locations,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
