//! Coin Relay - Caching proxy for CoinGecko market data.
//!
//! Clients ask for charts, prices, coin details and listings through a
//! stable local API. Unseen requests go upstream; identical ones are
//! answered from memory until they expire.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `market` - Operations, parameter sets and request constructors
//! - `cache` - Cache keys and the expiring response store (Moka)
//! - `upstream` - CoinGecko client with request pacing
//! - `fetcher` - Read-through coordinator with single-flight coalescing
//! - `api` - HTTP routes (axum)

mod api;
mod cache;
mod config;
mod fetcher;
mod market;
mod upstream;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use api::AppState;
use cache::{ExpiringStore, StoreConfig};
use config::Config;
use fetcher::Fetcher;
use upstream::CoinGeckoClient;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // RUST_LOG wins; otherwise LOG_LEVEL (default "info") for our crate
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOG_LEVEL").ok();
        EnvFilter::new(default_directives(level.as_deref()))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("Starting Coin Relay...");

    let config = Config::from_env()?;
    info!("Environment: {}", config.environment);
    info!(
        "Upstream: {} (pacing {:?}, timeout {:?})",
        config.upstream.base_url, config.upstream.pacing, config.upstream.timeout
    );

    let client = CoinGeckoClient::new(config.upstream.clone())?;

    let store = ExpiringStore::new(StoreConfig::with_ttl(config.cache_ttl));
    info!("Response cache TTL: {}s", config.cache_ttl.as_secs());

    let fetcher = Fetcher::new(store, Arc::new(client)).single_flight(config.single_flight);
    if !config.single_flight {
        info!("Single-flight disabled, concurrent misses fetch independently");
    }

    let state = AppState {
        fetcher,
        environment: config.environment.clone(),
    };

    api::serve(&config, state).await
}

/// Filter directives used when `RUST_LOG` is unset.
fn default_directives(log_level: Option<&str>) -> String {
    let level = match log_level.map(str::trim) {
        Some(level) if !level.is_empty() => level.to_ascii_lowercase(),
        _ => "info".to_string(),
    };
    format!("coin_relay={level},tower_http={level}")
}
