// src/forecast/stub.rs
use chrono::{DateTime, FixedOffset};

use super::{ConfidenceInterval, ForecastEngine, ForecastResult};
use crate::error::ForecastError;

pub const STUB_PROBABILITY: f64 = 0.5;
pub const STUB_LOWER: f64 = 0.3;
pub const STUB_UPPER: f64 = 0.7;

/// Fixed 0.5 in [0.3, 0.7] for any market and time. Never touches upstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubEngine;

#[async_trait::async_trait]
impl ForecastEngine for StubEngine {
    async fn generate_forecast(
        &self,
        market_id: &str,
        forecast_time: DateTime<FixedOffset>,
    ) -> Result<ForecastResult, ForecastError> {
        Ok(ForecastResult {
            market_id: market_id.to_string(),
            probability: STUB_PROBABILITY,
            confidence_interval: ConfidenceInterval::new(STUB_LOWER, STUB_UPPER),
            forecast_time,
        })
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp;

    #[tokio::test]
    async fn stub_is_constant_across_inputs() {
        let t1 = timestamp::parse_offset("2024-01-01T00:00:00Z").unwrap();
        let t2 = timestamp::parse_offset("2031-07-04T12:30:00-04:00").unwrap();

        let a = StubEngine.generate_forecast("X", t1).await.unwrap();
        let b = StubEngine.generate_forecast("SOMETHING-ELSE", t2).await.unwrap();

        assert_eq!(a.probability, 0.5);
        assert_eq!(a.confidence_interval, ConfidenceInterval::new(0.3, 0.7));
        assert_eq!(a.probability, b.probability);
        assert_eq!(a.confidence_interval, b.confidence_interval);
        assert_eq!(a.market_id, "X");
        assert_eq!(b.forecast_time, t2, "forecast_time is the caller's value");
    }
}
