// src/forecast/market.rs
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use super::{ConfidenceInterval, ForecastEngine, ForecastResult};
use crate::error::ForecastError;
use crate::market::SnapshotSource;

/// Forecasts the market's own implied probability, with a fixed-width interval around it.
pub struct MarketImpliedEngine {
    source: Arc<dyn SnapshotSource>,
    half_width: f64,
}

impl MarketImpliedEngine {
    pub fn new(source: Arc<dyn SnapshotSource>, half_width: f64) -> Self {
        Self { source, half_width }
    }
}

#[async_trait::async_trait]
impl ForecastEngine for MarketImpliedEngine {
    async fn generate_forecast(
        &self,
        market_id: &str,
        forecast_time: DateTime<FixedOffset>,
    ) -> Result<ForecastResult, ForecastError> {
        let snapshot = self.source.fetch_market_snapshot(market_id).await?;
        let p = snapshot.implied_probability;
        debug!(
            target: "forecast",
            market_id, source = self.source.name(), implied_probability = p,
            "deriving forecast from snapshot"
        );
        Ok(ForecastResult {
            market_id: market_id.to_string(),
            probability: p,
            confidence_interval: ConfidenceInterval::around(p, self.half_width),
            forecast_time,
        })
    }

    fn name(&self) -> &'static str {
        "market"
    }
}
