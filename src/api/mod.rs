//! HTTP API - Routes client requests to the fetcher.
//!
//! - `GET /` - Service status
//! - `/api/crypto/*` - Market data endpoints (see [`crypto`])
//!
//! Anything else answers 404 with a JSON error body.

mod crypto;
mod error;

use std::net::SocketAddr;

use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::fetcher::Fetcher;
use error::ApiError;

/// Routes advertised by the status endpoint.
const ENDPOINTS: &[&str] = &[
    "/api/crypto/chart/:coinId",
    "/api/crypto/prices",
    "/api/crypto/coin/:coinId",
    "/api/crypto/coins/list",
    "/api/crypto/markets",
];

/// Shared application state.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Read-through fetcher shared by every handler.
    pub fetcher: Fetcher,

    /// Deployment environment name, reported by `GET /`.
    pub environment: String,
}

/// Service status and route listing.
async fn status(State(state): State<AppState>) -> Json<Value> {
    let store = state.fetcher.store();
    Json(json!({
        "status": "online",
        "environment": state.environment,
        "message": "Crypto API relay is running",
        "endpoints": ENDPOINTS,
        "cached_entries": store.entry_count(),
        "cache_ttl_secs": store.ttl().as_secs(),
    }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

fn cors_layer(origins: &[HeaderValue]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().cloned())
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}

/// Build the full application router.
pub fn app_router(state: AppState, cors_origins: &[HeaderValue]) -> Router {
    Router::new()
        .route("/", get(status))
        .nest("/api/crypto", crypto::router())
        .fallback(not_found)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured port and serve until Ctrl+C.
pub async fn serve(config: &Config, state: AppState) -> anyhow::Result<()> {
    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(address).await?;

    info!("📡 Listening on: {}", address);
    match config.cors_origins.as_slice() {
        [] => info!("CORS: all origins allowed"),
        origins => info!("CORS: {:?}", origins),
    }

    axum::serve(listener, app_router(state, &config.cors_origins))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::cache::{ExpiringStore, StoreConfig};
    use crate::market::ParameterSet;
    use crate::upstream::{FetchError, FetchResult, Upstream};

    /// Answers with the path and parameters it was called with.
    #[derive(Default)]
    struct EchoUpstream {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Upstream for EchoUpstream {
        async fn call(&self, path: &str, params: &ParameterSet) -> FetchResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let params: serde_json::Map<String, Value> = params
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect();
            Ok(json!({ "path": path, "params": params }))
        }
    }

    struct FailingUpstream(FetchError);

    #[async_trait]
    impl Upstream for FailingUpstream {
        async fn call(&self, _path: &str, _params: &ParameterSet) -> FetchResult {
            Err(self.0.clone())
        }
    }

    fn app(upstream: Arc<dyn Upstream>) -> Router {
        let state = AppState {
            fetcher: Fetcher::new(ExpiringStore::new(StoreConfig::default()), upstream),
            environment: "test".to_string(),
        };
        app_router(state, &[])
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_markets_defaults_and_overrides() {
        let app = app(Arc::new(EchoUpstream::default()));

        let (status, body) = get_json(app, "/api/crypto/markets?currency=eur&page=2").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["path"], "coins/markets");
        assert_eq!(body["params"]["vs_currency"], "eur");
        assert_eq!(body["params"]["order"], "market_cap_desc");
        assert_eq!(body["params"]["per_page"], "100");
        assert_eq!(body["params"]["page"], "2");
    }

    #[tokio::test]
    async fn test_chart_route() {
        let app = app(Arc::new(EchoUpstream::default()));

        let (status, body) = get_json(app, "/api/crypto/chart/bitcoin?days=7").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["path"], "coins/bitcoin/market_chart");
        assert_eq!(body["params"]["days"], "7");
        assert_eq!(body["params"]["interval"], "hourly");
    }

    #[tokio::test]
    async fn test_prices_coin_and_list_routes() {
        let app = app(Arc::new(EchoUpstream::default()));

        let (_, prices) = get_json(app.clone(), "/api/crypto/prices").await;
        assert_eq!(prices["path"], "coins/markets");
        assert_eq!(prices["params"]["price_change_percentage"], "24h");

        let (_, coin) = get_json(app.clone(), "/api/crypto/coin/ethereum").await;
        assert_eq!(coin["path"], "coins/ethereum");
        assert_eq!(coin["params"]["market_data"], "true");

        let (_, list) = get_json(app, "/api/crypto/coins/list").await;
        assert_eq!(list["path"], "coins/list");
        assert_eq!(list["params"], json!({}));
    }

    #[tokio::test]
    async fn test_repeated_request_hits_cache() {
        let upstream = Arc::new(EchoUpstream::default());
        let app = app(upstream.clone());

        let (_, first) = get_json(app.clone(), "/api/crypto/coins/list").await;
        let (_, second) = get_json(app, "/api/crypto/coins/list").await;

        assert_eq!(first, second);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_coin_id_is_bad_request() {
        let upstream = Arc::new(EchoUpstream::default());
        let app = app(upstream.clone());

        let (status, body) = get_json(app, "/api/crypto/coin/bit%20coin").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Invalid coin id"));
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_query_is_bad_request() {
        let app = app(Arc::new(EchoUpstream::default()));

        let (status, body) = get_json(app, "/api/crypto/prices?per_page=lots").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid query"));
    }

    #[tokio::test]
    async fn test_upstream_status_passed_through() {
        let detail = json!({"status": {"error_code": 429, "error_message": "Rate limit"}});
        let app = app(Arc::new(FailingUpstream(FetchError::http(429, Some(detail.clone())))));

        let (status, body) = get_json(app, "/api/crypto/chart/bitcoin").await;

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "Request failed with status code 429");
        assert_eq!(body["details"], detail);
    }

    #[tokio::test]
    async fn test_network_failure_is_server_error() {
        let app = app(Arc::new(FailingUpstream(FetchError::network("connection refused"))));

        let (status, body) = get_json(app, "/api/crypto/markets").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "connection refused");
        assert_eq!(body["details"], Value::Null);
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let app = app(Arc::new(EchoUpstream::default()));

        let (status, body) = get_json(app, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "online");
        assert_eq!(body["environment"], "test");
        assert_eq!(body["endpoints"].as_array().unwrap().len(), 5);
        assert_eq!(body["cache_ttl_secs"], 300);
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let app = app(Arc::new(EchoUpstream::default()));

        let (status, body) = get_json(app, "/api/crypto/nothing").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Requested resource not found");
    }
}
