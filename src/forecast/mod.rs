// src/forecast/mod.rs
//! Forecast values and the pluggable engine capability.
//!
//! Engines only compute. Idempotency lives in the store/orchestrator, so an
//! engine may be called any number of times for the same market and day.

pub mod market;
pub mod stub;

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

pub use market::MarketImpliedEngine;
pub use stub::StubEngine;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl ConfidenceInterval {
    /// Bounds are reordered so that `lower_bound <= upper_bound` always holds.
    pub fn new(a: f64, b: f64) -> Self {
        let (lower_bound, upper_bound) = if a <= b { (a, b) } else { (b, a) };
        Self {
            lower_bound,
            upper_bound,
        }
    }

    /// `[p - half_width, p + half_width]` clamped to [0, 1].
    pub fn around(p: f64, half_width: f64) -> Self {
        let w = half_width.abs();
        Self::new((p - w).max(0.0), (p + w).min(1.0))
    }

    pub fn contains(&self, p: f64) -> bool {
        (self.lower_bound..=self.upper_bound).contains(&p)
    }
}

/// Written once by an engine, then shared verbatim with every caller of the same key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub market_id: String,
    pub probability: f64,
    pub confidence_interval: ConfidenceInterval,
    pub forecast_time: DateTime<FixedOffset>,
}

/// Inbound `POST /forecast` body. Validation happens in the orchestrator.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastRequest {
    #[serde(default)]
    pub market_id: String,
    /// ISO-8601; defaults to "now" when absent.
    #[serde(default)]
    pub forecast_time: Option<String>,
}

impl ForecastRequest {
    pub fn new(market_id: impl Into<String>, forecast_time: Option<&str>) -> Self {
        Self {
            market_id: market_id.into(),
            forecast_time: forecast_time.map(str::to_string),
        }
    }
}

#[async_trait::async_trait]
pub trait ForecastEngine: Send + Sync {
    async fn generate_forecast(
        &self,
        market_id: &str,
        forecast_time: DateTime<FixedOffset>,
    ) -> Result<ForecastResult, ForecastError>;

    /// Engine name for logs.
    fn name(&self) -> &'static str;
}

pub type DynForecastEngine = Arc<dyn ForecastEngine>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_is_ordered_and_clamped() {
        let ci = ConfidenceInterval::new(0.7, 0.3);
        assert_eq!(ci.lower_bound, 0.3);
        assert_eq!(ci.upper_bound, 0.7);

        let ci = ConfidenceInterval::around(0.95, 0.1);
        assert_eq!(ci.upper_bound, 1.0);
        assert!((ci.lower_bound - 0.85).abs() < 1e-12);
        assert!(ci.contains(0.95));

        let ci = ConfidenceInterval::around(0.0, 0.2);
        assert_eq!(ci.lower_bound, 0.0);
    }

    #[test]
    fn result_serializes_with_nested_interval() {
        let r = ForecastResult {
            market_id: "X".into(),
            probability: 0.5,
            confidence_interval: ConfidenceInterval::new(0.3, 0.7),
            forecast_time: DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap(),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["market_id"], "X");
        assert_eq!(v["probability"], 0.5);
        assert_eq!(v["confidence_interval"]["lower_bound"], 0.3);
        assert_eq!(v["confidence_interval"]["upper_bound"], 0.7);
        assert!(v["forecast_time"].as_str().unwrap().starts_with("2024-01-01T00:00:00"));
    }
}
