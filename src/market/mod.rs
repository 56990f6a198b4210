// src/market/mod.rs
//! Market snapshot fetcher: upstream market object -> validated [`MarketSnapshot`].

pub mod client;
pub mod types;

use chrono::{DateTime, Utc};

use crate::error::ForecastError;
use crate::quote::{derive_with_fallback, PriceFallback};
use crate::timestamp;

pub use client::KalshiClient;
pub use types::{MarketEnvelope, MarketSnapshot, RawMarket};

/// Only binary yes/no markets can be turned into a single implied probability.
pub const SUPPORTED_MARKET_TYPE: &str = "binary";

/// Anything that can hand out a fresh snapshot for a market id.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_market_snapshot(&self, market_id: &str) -> Result<MarketSnapshot, ForecastError>;
    fn name(&self) -> &'static str;
}

/// Assemble a snapshot from a parsed upstream market.
///
/// Checks run in order: market type, price normalization, `close_time` parsing.
pub fn snapshot_from_raw(
    raw: RawMarket,
    fallback: PriceFallback,
    fetched_at: DateTime<Utc>,
) -> Result<MarketSnapshot, ForecastError> {
    if raw.market_type != SUPPORTED_MARKET_TYPE {
        return Err(ForecastError::UnsupportedMarketType(raw.market_type));
    }

    let implied_probability = derive_with_fallback(&raw.quote, fallback)?;

    let close_time = timestamp::parse_offset(&raw.close_time).ok_or_else(|| {
        ForecastError::UpstreamPayload(format!("unparseable close_time {:?}", raw.close_time))
    })?;

    // Upstream sends "" for markets that have not settled yet.
    let result = raw.result.filter(|r| !r.trim().is_empty());

    Ok(MarketSnapshot {
        market_id: raw.ticker,
        question: raw.title,
        implied_probability,
        close_time,
        fetched_at,
        status: raw.status,
        result,
    })
}
