//! Request constructors for each supported operation.

use thiserror::Error;

use super::{Operation, ParameterSet};

pub const DEFAULT_CURRENCY: &str = "usd";
pub const DEFAULT_ORDER: &str = "market_cap_desc";

/// A fully resolved upstream request: what to fetch and from where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketRequest {
    pub operation: Operation,
    pub path: String,
    pub params: ParameterSet,
}

/// Rejected coin identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid coin id: {0:?}")]
pub struct InvalidCoinId(pub String);

/// Check that a coin id is safe to splice into an upstream path.
pub fn validate_coin_id(coin_id: &str) -> Result<(), InvalidCoinId> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');

    if coin_id.is_empty() || coin_id == "." || coin_id == ".." || !coin_id.chars().all(allowed) {
        return Err(InvalidCoinId(coin_id.to_string()));
    }
    Ok(())
}

impl MarketRequest {
    pub fn new(operation: Operation, path: impl Into<String>, params: ParameterSet) -> Self {
        Self {
            operation,
            path: path.into(),
            params,
        }
    }

    /// Historical market chart for one coin.
    pub fn chart(
        coin_id: &str,
        vs_currency: Option<String>,
        days: Option<String>,
        interval: Option<String>,
    ) -> Result<Self, InvalidCoinId> {
        validate_coin_id(coin_id)?;

        let mut params = ParameterSet::new()
            .with("vs_currency", vs_currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()))
            .with("interval", interval.unwrap_or_else(|| "hourly".to_string()));
        match days {
            Some(days) => params.insert("days", days),
            None => params.insert("days", 30i64),
        }

        Ok(Self::new(
            Operation::Chart,
            format!("coins/{coin_id}/market_chart"),
            params,
        ))
    }

    /// Top coins by market cap with 24h price change.
    pub fn prices(vs_currency: Option<String>, per_page: Option<u32>, page: Option<u32>) -> Self {
        let params = ParameterSet::new()
            .with("vs_currency", vs_currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()))
            .with("order", DEFAULT_ORDER)
            .with("per_page", per_page.unwrap_or(10))
            .with("page", page.unwrap_or(1))
            .with("price_change_percentage", "24h");

        Self::new(Operation::Prices, "coins/markets", params)
    }

    /// Single coin details with market data only.
    pub fn coin_detail(coin_id: &str) -> Result<Self, InvalidCoinId> {
        validate_coin_id(coin_id)?;

        let params = ParameterSet::new()
            .with("localization", false)
            .with("tickers", false)
            .with("market_data", true)
            .with("community_data", false)
            .with("developer_data", false);

        Ok(Self::new(
            Operation::CoinDetail,
            format!("coins/{coin_id}"),
            params,
        ))
    }

    /// Every coin id known to the provider.
    pub fn coin_list() -> Self {
        Self::new(Operation::CoinList, "coins/list", ParameterSet::new())
    }

    /// Paginated market listing.
    pub fn markets(
        vs_currency: Option<String>,
        order: Option<String>,
        per_page: Option<u32>,
        page: Option<u32>,
    ) -> Self {
        let params = ParameterSet::new()
            .with("vs_currency", vs_currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()))
            .with("order", order.unwrap_or_else(|| DEFAULT_ORDER.to_string()))
            .with("per_page", per_page.unwrap_or(100))
            .with("page", page.unwrap_or(1));

        Self::new(Operation::Markets, "coins/markets", params)
    }
}
