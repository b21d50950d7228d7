use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use weather_archive::{ArchiveClient, ArchiveConfig, telemetry, web};

#[tokio::main]
async fn main() -> Result<()> {
    // Optional first argument: path to a TOML config file
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = ArchiveConfig::load_from_path(config_path)?;

    telemetry::init(&config.logging)?;
    info!("Starting weather-archive {}", weather_archive::VERSION);

    let client = ArchiveClient::new(&config.archive, &config.cache)?;
    info!(
        "Archive client ready (retries: {}, backoff: {}s, cache TTL: {}s)",
        config.archive.max_retries, config.archive.backoff_factor, config.cache.ttl_seconds
    );

    let state = web::AppState::new(Arc::new(client), &config);
    web::run(&config.server, state).await
}
