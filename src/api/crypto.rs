//! `/api/crypto` handlers.
//!
//! Each handler turns query and path parameters into a [`MarketRequest`]
//! and passes the upstream JSON back unchanged.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use super::error::ApiResult;
use super::AppState;
use crate::market::MarketRequest;

#[derive(Debug, Deserialize)]
struct ChartQuery {
    currency: Option<String>,
    days: Option<String>,
    interval: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PricesQuery {
    currency: Option<String>,
    per_page: Option<u32>,
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct MarketsQuery {
    currency: Option<String>,
    order: Option<String>,
    per_page: Option<u32>,
    page: Option<u32>,
}

/// Market chart for one coin.
async fn chart(
    State(state): State<AppState>,
    Path(coin_id): Path<String>,
    query: Result<Query<ChartQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(q) = query?;
    let request = MarketRequest::chart(&coin_id, q.currency, q.days, q.interval)?;
    Ok(Json(state.fetcher.fetch(&request).await?))
}

/// Top coins with current price and 24h change.
async fn prices(
    State(state): State<AppState>,
    query: Result<Query<PricesQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(q) = query?;
    let request = MarketRequest::prices(q.currency, q.per_page, q.page);
    Ok(Json(state.fetcher.fetch(&request).await?))
}

async fn coin(
    State(state): State<AppState>,
    Path(coin_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let request = MarketRequest::coin_detail(&coin_id)?;
    Ok(Json(state.fetcher.fetch(&request).await?))
}

async fn coin_list(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(Json(state.fetcher.fetch(&MarketRequest::coin_list()).await?))
}

async fn markets(
    State(state): State<AppState>,
    query: Result<Query<MarketsQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(q) = query?;
    let request = MarketRequest::markets(q.currency, q.order, q.per_page, q.page);
    Ok(Json(state.fetcher.fetch(&request).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chart/:coin_id", get(chart))
        .route("/prices", get(prices))
        .route("/coin/:coin_id", get(coin))
        .route("/coins/list", get(coin_list))
        .route("/markets", get(markets))
}
