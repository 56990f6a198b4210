// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod forecast;
pub mod market;
pub mod metrics;
pub mod orchestrator;
pub mod quote;
pub mod store;
pub mod telemetry;
pub mod timestamp;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router as router, AppState};
pub use crate::config::{EngineKind, GatewayConfig};
pub use crate::error::ForecastError;
pub use crate::forecast::{ConfidenceInterval, ForecastEngine, ForecastRequest, ForecastResult};
pub use crate::market::MarketSnapshot;
pub use crate::store::{CacheStatus, IdempotencyKey, IdempotencyStore};

use std::sync::Arc;

use axum::Router;
use tracing::info;

use crate::forecast::{DynForecastEngine, MarketImpliedEngine, StubEngine};
use crate::market::KalshiClient;

/// Pick the forecast engine named by the config.
pub fn build_engine(cfg: &GatewayConfig) -> anyhow::Result<DynForecastEngine> {
    let engine: DynForecastEngine = match cfg.engine {
        EngineKind::Stub => Arc::new(StubEngine),
        EngineKind::Market => {
            let client = KalshiClient::new(cfg)?;
            Arc::new(MarketImpliedEngine::new(Arc::new(client), cfg.ci_half_width))
        }
    };
    Ok(engine)
}

/// Build the full application router from a validated config.
///
/// The idempotency store is created here, once, and owned by the returned router.
pub fn app(cfg: &GatewayConfig) -> anyhow::Result<Router> {
    let engine = build_engine(cfg)?;
    info!(
        engine = engine.name(),
        base_url = %cfg.base_url,
        timeout_ms = cfg.request_timeout_ms,
        key_len = cfg.api_key.len(),
        "forecast gateway configured"
    );

    let mut state = AppState::new(engine);
    if cfg.metrics_enabled {
        state = state.with_metrics(crate::metrics::Metrics::init(cfg.request_timeout_ms)?);
    }
    Ok(api::create_router(state))
}
