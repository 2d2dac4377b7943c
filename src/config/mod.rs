//! Configuration module for Coin Relay.
//!
//! Loads configuration from environment variables (and an optional `.env`).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use thiserror::Error;

use crate::cache::StoreConfig;
use crate::upstream::UpstreamConfig;

/// Malformed configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,
    pub environment: String,

    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<HeaderValue>,

    // Upstream
    pub upstream: UpstreamConfig,

    // Cache
    pub cache_ttl: Duration,

    /// Coalesce concurrent identical upstream calls.
    pub single_flight: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every variable is optional; malformed values are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let defaults = UpstreamConfig::default();

        let upstream = UpstreamConfig {
            base_url: var("COINGECKO_API_URL").unwrap_or(defaults.base_url),
            api_key: var("COINGECKO_API_KEY"),
            api_key_header: var("COINGECKO_API_KEY_HEADER").unwrap_or(defaults.api_key_header),
            pacing: match var("UPSTREAM_PACING_MS") {
                Some(v) => Duration::from_millis(parse("UPSTREAM_PACING_MS", v)?),
                None => defaults.pacing,
            },
            timeout: match var("UPSTREAM_TIMEOUT_SECS") {
                Some(v) => Duration::from_secs(parse("UPSTREAM_TIMEOUT_SECS", v)?),
                None => defaults.timeout,
            },
        };

        let cache_ttl = match var("CACHE_TTL") {
            Some(v) => Duration::from_secs(parse("CACHE_TTL", v)?),
            None => StoreConfig::default().ttl,
        };

        let cors_origins = match var("CORS_ORIGIN") {
            Some(v) if v != "*" => parse_origins(&v)?,
            _ => Vec::new(),
        };

        Ok(Self {
            port: var("PORT").map_or(Ok(3000), |v| parse("PORT", v))?,
            environment: var("APP_ENV").unwrap_or_else(|| "development".to_string()),
            cors_origins,
            upstream,
            cache_ttl,
            single_flight: var("SINGLE_FLIGHT").map_or(Ok(true), |v| parse_bool("SINGLE_FLIGHT", v))?,
        })
    }
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}

/// Parse a comma-separated origin list.
fn parse_origins(value: &str) -> Result<Vec<HeaderValue>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|_| ConfigError::Invalid {
                name: "CORS_ORIGIN",
                value: origin.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.environment, "development");
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.upstream.base_url, "https://api.coingecko.com/api/v3");
        assert_eq!(config.upstream.api_key, None);
        assert_eq!(config.upstream.api_key_header, "x-cg-api-key");
        assert_eq!(config.upstream.pacing, Duration::from_millis(500));
        assert_eq!(config.upstream.timeout, Duration::from_secs(15));
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert!(config.single_flight);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PORT", "8080"),
            ("APP_ENV", "production"),
            ("CORS_ORIGIN", "https://a.example, https://b.example"),
            ("COINGECKO_API_URL", "https://pro-api.coingecko.com/api/v3"),
            ("COINGECKO_API_KEY", "secret"),
            ("CACHE_TTL", "60"),
            ("UPSTREAM_PACING_MS", "250"),
            ("SINGLE_FLIGHT", "off"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.environment, "production");
        assert_eq!(config.cors_origins.len(), 2);
        assert_eq!(config.upstream.api_key.as_deref(), Some("secret"));
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.upstream.pacing, Duration::from_millis(250));
        assert!(!config.single_flight);
    }

    #[test]
    fn test_empty_api_key_means_none() {
        let config = load(&[("COINGECKO_API_KEY", "  ")]).unwrap();
        assert_eq!(config.upstream.api_key, None);
    }

    #[test]
    fn test_wildcard_origin_is_any() {
        let config = load(&[("CORS_ORIGIN", "*")]).unwrap();
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_malformed_values_rejected() {
        assert!(matches!(
            load(&[("CACHE_TTL", "five minutes")]),
            Err(ConfigError::Invalid { name: "CACHE_TTL", .. })
        ));
        assert!(matches!(
            load(&[("PORT", "70000")]),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
        assert!(matches!(
            load(&[("SINGLE_FLIGHT", "maybe")]),
            Err(ConfigError::Invalid { name: "SINGLE_FLIGHT", .. })
        ));
    }
}
