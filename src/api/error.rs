//! HTTP rendering of request failures.

use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::market::InvalidCoinId;
use crate::upstream::FetchError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Upstream(#[from] FetchError),

    #[error(transparent)]
    InvalidCoinId(#[from] InvalidCoinId),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Requested resource not found")]
    NotFound,
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidQuery(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Upstream(err) => {
                let status = StatusCode::from_u16(err.status_hint())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let body = json!({
                    "error": err.message(),
                    "details": err.detail(),
                });
                (status, Json(body)).into_response()
            }
            Self::InvalidCoinId(_) | Self::InvalidQuery(_) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": self.to_string() }))).into_response()
            }
            Self::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": self.to_string() }))).into_response()
            }
        }
    }
}
