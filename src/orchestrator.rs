// src/orchestrator.rs
//! Request-handling core: validate, derive the idempotency key, consult the store,
//! run the engine on a miss.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use metrics::{counter, gauge};
use tracing::{info, warn};

use crate::error::ForecastError;
use crate::forecast::{DynForecastEngine, ForecastRequest, ForecastResult};
use crate::store::{CacheStatus, IdempotencyKey, IdempotencyStore};
use crate::timestamp;

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub market_id: String,
    pub forecast_time: DateTime<FixedOffset>,
}

impl ValidatedRequest {
    pub fn key(&self) -> IdempotencyKey {
        IdempotencyKey::new(self.market_id.clone(), &self.forecast_time)
    }
}

/// `market_id` must be non-blank; `forecast_time`, when given, must parse.
/// A missing `forecast_time` becomes "now".
pub fn validate(req: &ForecastRequest) -> Result<ValidatedRequest, ForecastError> {
    let market_id = req.market_id.trim();
    if market_id.is_empty() {
        return Err(ForecastError::Validation("market_id must not be empty".into()));
    }

    let forecast_time = match req.forecast_time.as_deref() {
        None => timestamp::now_fixed(),
        Some(raw) => timestamp::parse_lenient(raw).ok_or_else(|| {
            ForecastError::Validation(format!("forecast_time {raw:?} is not an ISO-8601 timestamp"))
        })?,
    };

    Ok(ValidatedRequest {
        market_id: market_id.to_string(),
        forecast_time,
    })
}

#[derive(Clone)]
pub struct ForecastOrchestrator {
    store: Arc<IdempotencyStore>,
    engine: DynForecastEngine,
}

impl ForecastOrchestrator {
    pub fn new(store: Arc<IdempotencyStore>, engine: DynForecastEngine) -> Self {
        Self { store, engine }
    }

    pub fn store(&self) -> &Arc<IdempotencyStore> {
        &self.store
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub async fn handle_forecast_request(
        &self,
        req: &ForecastRequest,
    ) -> Result<(ForecastResult, CacheStatus), ForecastError> {
        counter!("forecast_requests_total").increment(1);

        let out = match validate(req) {
            Ok(valid) => self.forecast(valid).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &out {
            counter!("forecast_errors_total", "kind" => e.kind()).increment(1);
            warn!(
                target: "forecast",
                market_id = %req.market_id, kind = e.kind(), error = %e,
                "forecast request failed"
            );
        }
        out
    }

    async fn forecast(
        &self,
        req: ValidatedRequest,
    ) -> Result<(ForecastResult, CacheStatus), ForecastError> {
        let key = req.key();
        let engine = self.engine.clone();
        let (result, status) = self
            .store
            .get_or_compute(key.clone(), || async move {
                engine
                    .generate_forecast(&req.market_id, req.forecast_time)
                    .await
            })
            .await?;

        match status {
            CacheStatus::Hit => {
                counter!("forecast_cache_hits_total").increment(1);
                info!(target: "forecast", market_id = %result.market_id, %key, "returned cached forecast");
            }
            CacheStatus::Miss => {
                counter!("forecast_cache_misses_total").increment(1);
                gauge!("forecast_store_entries").set(self.store.len() as f64);
                info!(
                    target: "forecast",
                    market_id = %result.market_id,
                    %key,
                    engine = self.engine.name(),
                    probability = result.probability,
                    lower_bound = result.confidence_interval.lower_bound,
                    upper_bound = result.confidence_interval.upper_bound,
                    "created new forecast"
                );
            }
        }
        Ok((result, status))
    }
}
