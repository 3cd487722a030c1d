use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use urbansite::api::AppState;
use urbansite::{SiteService, UrbanSiteConfig, cache, logging, web};

#[tokio::main]
async fn main() -> Result<()> {
    // optional config path as the only argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = UrbanSiteConfig::load_from_path(config_path).context("Failed to load configuration")?;

    logging::init_tracing(&config.logging);
    info!("Starting UrbanSite {}", urbansite::VERSION);

    let cache = cache::open_configured(&config.cache);
    match cache.evict_expired().await {
        Ok(removed) if removed > 0 => info!("Removed {} expired cache entries", removed),
        Ok(_) => {}
        Err(e) => warn!("Failed to evict expired cache entries: {:#}", e),
    }

    let service = SiteService::from_config(&config, cache)?;
    let state = AppState::new(Arc::new(service), &config.search);

    web::run(config.server.port, state).await
}
