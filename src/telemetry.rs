// src/telemetry.rs
//! Tracing setup and per-request correlation ids.
//!
//! Every request gets a fresh UUID. It is attached to a `request` span (so all
//! events emitted while handling the request carry it) and kept in a task-local
//! for code that needs the raw value, e.g. outbound headers and error bodies.

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const DEFAULT_FILTER: &str = "market_forecast_gateway=info,forecast=info,upstream=info,warn";

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Correlation id of the request being handled by the current task, if any.
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(|id| id.clone()).ok()
}

/// Run `fut` with `request_id` as the ambient correlation id.
pub async fn with_request_id<F: std::future::Future>(request_id: String, fut: F) -> F::Output {
    REQUEST_ID.scope(request_id, fut).await
}

/// Axum middleware: tag the request, run the handler inside its span, echo the id back.
pub async fn request_id_layer(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let mut resp = with_request_id(request_id.clone(), next.run(req).instrument(span)).await;

    if let Ok(v) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(REQUEST_ID_HEADER, v);
    }
    resp
}

/// Install the global subscriber. `LOG_FORMAT=json` selects JSON lines.
/// Safe to call more than once; later calls (or a host-installed subscriber) win silently.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
