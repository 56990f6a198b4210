use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (once per process) and publish the static
    /// upstream timeout gauge.
    pub fn init(upstream_timeout_ms: u64) -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| PrometheusBuilder::new().install_recorder())?
            .clone();

        describe_all();
        gauge!("upstream_timeout_ms").set(upstream_timeout_ms as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe_all() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("forecast_requests_total", "Forecast requests received.");
        describe_counter!(
            "forecast_cache_hits_total",
            "Forecasts served from the idempotency store."
        );
        describe_counter!(
            "forecast_cache_misses_total",
            "Forecasts computed by the engine."
        );
        describe_counter!("forecast_errors_total", "Failed forecast requests by kind.");
        describe_gauge!("forecast_store_entries", "Committed forecasts held in memory.");
        describe_counter!("upstream_requests_total", "Market-data API calls issued.");
        describe_counter!("upstream_errors_total", "Failed market-data API calls.");
        describe_histogram!("upstream_fetch_ms", "Market-data API latency in milliseconds.");
        describe_gauge!("upstream_timeout_ms", "Configured market-data API timeout.");
    });
}
