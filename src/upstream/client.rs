//! CoinGecko HTTP client.
//!
//! Every call waits a fixed pacing interval before it is sent, to stay
//! under the provider's informal rate limit. There are no retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{FetchError, FetchResult, Upstream};
use crate::market::ParameterSet;

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_API_KEY_HEADER: &str = "x-cg-api-key";
pub const DEFAULT_PACING: Duration = Duration::from_millis(500);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection settings for the provider. Fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    /// Credential; `None` or empty means unauthenticated.
    pub api_key: Option<String>,
    pub api_key_header: String,
    /// Delay before every outbound call.
    pub pacing: Duration,
    /// Bound on a whole request, connect to last body byte.
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            pacing: DEFAULT_PACING,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Failure to set up the HTTP client.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid API key header name: {0}")]
    HeaderName(String),

    #[error("API key is not a valid header value")]
    HeaderValue,

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// `reqwest` backed provider client.
#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    http: Client,
    base_url: String,
    pacing: Duration,
}

impl CoinGeckoClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, BuildError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            let name = HeaderName::from_bytes(config.api_key_header.as_bytes())
                .map_err(|_| BuildError::HeaderName(config.api_key_header.clone()))?;
            let mut value = HeaderValue::from_str(key).map_err(|_| BuildError::HeaderValue)?;
            value.set_sensitive(true);
            headers.insert(name, value);
            info!("CoinGecko API key configured ({})", config.api_key_header);
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            pacing: config.pacing,
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Parse a body as JSON, falling back to the raw text.
fn body_to_value(body: String) -> Value {
    serde_json::from_str(&body).unwrap_or(Value::String(body))
}

#[async_trait]
impl Upstream for CoinGeckoClient {
    async fn call(&self, path: &str, params: &ParameterSet) -> FetchResult {
        let url = self.url_for(path);
        info!("Fetching from CoinGecko: {}", url);

        tokio::time::sleep(self.pacing).await;

        let mut request = self.http.get(&url);
        if !params.is_empty() {
            request = request.query(&params.to_pairs());
        }

        let response = request.send().await.map_err(|e| {
            warn!("CoinGecko request failed: {}", e);
            FetchError::network(e)
        })?;

        let status = response.status();

        if status.is_success() {
            let body = response.text().await.map_err(|e| {
                warn!("CoinGecko body read failed: {}", e);
                FetchError::network(e)
            })?;
            debug!("CoinGecko responded {} ({} bytes)", status, body.len());
            return Ok(body_to_value(body));
        }

        // The status is what matters here; a body that can't be read is just absent.
        let detail = response
            .text()
            .await
            .ok()
            .filter(|body| !body.is_empty())
            .map(body_to_value);

        warn!("CoinGecko API error: {} for {}", status, url);
        Err(FetchError::http(status.as_u16(), detail))
    }
}
