//! Upstream module - Calls to the market data provider.
//!
//! - `Upstream` - Async seam between the fetcher and the network
//! - `CoinGeckoClient` - `reqwest` implementation with request pacing
//! - `FetchError` - Structured upstream failure

mod client;

pub use client::{CoinGeckoClient, UpstreamConfig};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::market::ParameterSet;

/// Status reported when no upstream status is available.
pub const GENERIC_ERROR_STATUS: u16 = 500;

/// Upstream failure, carried unchanged to the HTTP layer.
///
/// `Clone` so one coalesced result can be handed to every waiter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// The provider answered with a non-2xx status.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        detail: Option<Value>,
    },

    /// No response was received (timeout, refused connection, DNS).
    #[error("{message}")]
    Network { message: String },
}

impl FetchError {
    pub fn http(status: u16, detail: Option<Value>) -> Self {
        Self::Http {
            status,
            message: format!("Request failed with status code {status}"),
            detail,
        }
    }

    pub fn network(err: impl std::fmt::Display) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }

    /// Upstream status when one was received, otherwise a generic server error.
    pub fn status_hint(&self) -> u16 {
        match self {
            Self::Http { status, .. } => *status,
            Self::Network { .. } => GENERIC_ERROR_STATUS,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Http { message, .. } | Self::Network { message } => message,
        }
    }

    /// Body returned by the provider with the failure, if any.
    pub fn detail(&self) -> Option<&Value> {
        match self {
            Self::Http { detail, .. } => detail.as_ref(),
            Self::Network { .. } => None,
        }
    }
}

/// Outcome of one upstream call.
pub type FetchResult = Result<Value, FetchError>;

/// Something that can answer market data requests.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Perform one call for `path` with `params` as the query string.
    async fn call(&self, path: &str, params: &ParameterSet) -> FetchResult;
}
