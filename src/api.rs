use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::ForecastError;
use crate::forecast::{DynForecastEngine, ForecastRequest};
use crate::metrics::Metrics;
use crate::orchestrator::ForecastOrchestrator;
use crate::store::IdempotencyStore;
use crate::telemetry;

/// Cache diagnostics header on `/forecast`: "HIT" or "MISS".
pub const CACHE_HEADER: &str = "x-forecast-cache";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ForecastOrchestrator>,
    metrics: Option<Metrics>,
}

impl AppState {
    /// Fresh, empty idempotency store around `engine`.
    pub fn new(engine: DynForecastEngine) -> Self {
        Self::with_store(Arc::new(IdempotencyStore::new()), engine)
    }

    pub fn with_store(store: Arc<IdempotencyStore>, engine: DynForecastEngine) -> Self {
        Self {
            orchestrator: Arc::new(ForecastOrchestrator::new(store, engine)),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    let metrics = state.metrics.clone();

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/forecast", post(create_forecast))
        .with_state(state);

    if let Some(m) = metrics {
        router = router.merge(m.router());
    }

    router
        .layer(CorsLayer::very_permissive())
        .layer(middleware::from_fn(telemetry::request_id_layer))
}

async fn health() -> Json<Value> {
    info!("Health check endpoint called");
    Json(json!({ "status": "ok" }))
}

async fn create_forecast(
    State(state): State<AppState>,
    payload: Result<Json<ForecastRequest>, JsonRejection>,
) -> Result<Response, ForecastError> {
    let Json(req) = payload.map_err(|rej| {
        let e = ForecastError::Validation(rej.body_text());
        tracing::warn!(target: "forecast", error = %e, "rejected forecast request body");
        e
    })?;

    let (result, status) = state.orchestrator.handle_forecast_request(&req).await?;
    Ok(([(CACHE_HEADER, status.as_str())], Json(result)).into_response())
}
