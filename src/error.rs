// src/error.rs
//! Error taxonomy for the forecast core and its HTTP mapping.
//!
//! Normalizer and fetcher errors travel unchanged up to the orchestrator; the
//! transport layer turns them into a status code + JSON body here.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::telemetry;

#[derive(Debug, Error)]
pub enum ForecastError {
    /// Client input is malformed (empty market id, bad timestamp, bad JSON).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Only binary yes/no markets are supported.
    #[error("unsupported market type: {0}")]
    UnsupportedMarketType(String),

    /// None of the quote fields could produce a probability.
    #[error("no usable price: {0}")]
    NoUsablePrice(String),

    #[error("upstream request timed out after {0:?}")]
    UpstreamTimeout(Duration),

    #[error("upstream HTTP status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("upstream transport error: {0}")]
    UpstreamTransport(String),

    #[error("malformed upstream payload: {0}")]
    UpstreamPayload(String),
}

impl ForecastError {
    /// Stable machine-readable category, also used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::Validation(_) => "validation_error",
            ForecastError::UnsupportedMarketType(_) => "unsupported_market_type",
            ForecastError::NoUsablePrice(_) => "no_usable_price",
            ForecastError::UpstreamTimeout(_)
            | ForecastError::UpstreamStatus { .. }
            | ForecastError::UpstreamTransport(_)
            | ForecastError::UpstreamPayload(_) => "upstream_error",
        }
    }

    pub fn is_upstream(&self) -> bool {
        self.kind() == "upstream_error"
    }

    /// Whether a caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        match self {
            ForecastError::Validation(_) | ForecastError::UnsupportedMarketType(_) => false,
            ForecastError::UpstreamStatus { status, .. } => *status >= 500 || *status == 429,
            ForecastError::UpstreamPayload(_) => false,
            _ => true,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ForecastError::Validation(_) => StatusCode::BAD_REQUEST,
            ForecastError::UnsupportedMarketType(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ForecastError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ForecastError::NoUsablePrice(_)
            | ForecastError::UpstreamStatus { .. }
            | ForecastError::UpstreamTransport(_)
            | ForecastError::UpstreamPayload(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
}

impl IntoResponse for ForecastError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
            request_id: telemetry::current_request_id(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_4xx_and_are_not_retryable() {
        let v = ForecastError::Validation("market_id must not be empty".into());
        assert_eq!(v.status_code(), StatusCode::BAD_REQUEST);
        assert!(!v.is_retryable());

        let u = ForecastError::UnsupportedMarketType("multi_outcome".into());
        assert_eq!(u.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!u.is_retryable());
    }

    #[test]
    fn upstream_family_shares_one_kind() {
        let errs = [
            ForecastError::UpstreamTimeout(Duration::from_secs(10)),
            ForecastError::UpstreamStatus {
                status: 503,
                body: String::new(),
            },
            ForecastError::UpstreamTransport("connection refused".into()),
            ForecastError::UpstreamPayload("missing field `market`".into()),
        ];
        for e in &errs {
            assert_eq!(e.kind(), "upstream_error");
            assert!(e.is_upstream());
            assert!(e.status_code().is_server_error());
        }
        assert_eq!(errs[0].status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn no_usable_price_is_5xx_and_retryable() {
        let e = ForecastError::NoUsablePrice("no bid/ask or last_price".into());
        assert_eq!(e.status_code(), StatusCode::BAD_GATEWAY);
        assert!(e.is_retryable());
        assert!(!e.is_upstream());
    }

    #[test]
    fn upstream_client_status_is_not_retryable() {
        let e = ForecastError::UpstreamStatus {
            status: 404,
            body: "not found".into(),
        };
        assert!(!e.is_retryable());
        let e = ForecastError::UpstreamStatus {
            status: 429,
            body: String::new(),
        };
        assert!(e.is_retryable());
    }
}
