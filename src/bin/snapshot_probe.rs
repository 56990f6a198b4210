//! One-shot probe: fetch a market snapshot with the gateway's config and print it as JSON.
//!
//! Usage: `snapshot_probe <market_id>`

use market_forecast_gateway::market::{KalshiClient, SnapshotSource};
use market_forecast_gateway::GatewayConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let market_id = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: snapshot_probe <market_id>"))?;

    let cfg = GatewayConfig::load()?;
    let client = KalshiClient::new(&cfg)?;

    let snapshot = client.fetch_market_snapshot(&market_id).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
