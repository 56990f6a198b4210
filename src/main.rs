//! Market Forecast Gateway: binary entrypoint.
//! Loads configuration (fatal if the market-data credential is missing), then
//! boots the Axum HTTP server with the forecast routes.

use market_forecast_gateway::{app, telemetry, GatewayConfig};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    telemetry::init_tracing();

    // Refuse to serve without a usable config.
    let cfg = GatewayConfig::load()?;
    let router = app(&cfg)?;

    Ok(router.into())
}
