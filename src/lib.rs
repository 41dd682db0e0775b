pub mod cli;
pub mod core;
pub mod providers;

use crate::core::cache::TtlCache;
use crate::core::config::AppConfig;
use crate::core::enrich::EnrichmentService;
use anyhow::Result;
use chrono::Duration;
use providers::caching::{CachingQuoteProvider, CachingRateProvider};
use providers::yahoo_finance::{YahooCurrencyProvider, YahooInfoProvider, YahooQuoteProvider};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
pub enum AppCommand {
    Summary,
    Alloc,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Carteira starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let base_url = config
        .providers
        .yahoo
        .as_ref()
        .map_or("https://query1.finance.yahoo.com", |p| &p.base_url);

    // Shared session caches: separate freshness domains for quotes, FX and
    // descriptive info.
    let quote_cache = Arc::new(TtlCache::new());
    let rate_cache = Arc::new(TtlCache::new());
    let info_cache = Arc::new(TtlCache::new());

    let quotes = CachingQuoteProvider::new(
        YahooQuoteProvider::new(base_url),
        Arc::clone(&quote_cache),
        Duration::seconds(config.cache.quote_ttl_secs),
    );
    let rates = CachingRateProvider::new(
        YahooCurrencyProvider::new(base_url),
        Arc::clone(&rate_cache),
        Duration::seconds(config.cache.rate_ttl_secs),
    );
    let enrichment = EnrichmentService::new(
        Arc::new(YahooInfoProvider::new(base_url)),
        Arc::clone(&info_cache),
    );

    match command {
        AppCommand::Summary => cli::summary::run(&config, &quotes, &rates, &enrichment).await,
        AppCommand::Alloc => cli::alloc::run(&config, &quotes, &rates, &enrichment).await,
    }
}
