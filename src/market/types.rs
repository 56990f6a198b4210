// src/market/types.rs
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::quote::RawQuote;

/// One upstream read of a binary market. Built once per fetch, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub market_id: String,
    pub question: String,
    /// Always within [0, 1].
    pub implied_probability: f64,
    pub close_time: DateTime<FixedOffset>,
    pub fetched_at: DateTime<Utc>,
    pub status: String, // e.g. "open", "closed", "settled"
    pub result: Option<String>,
}

/// `GET {base}/markets/{id}` response envelope.
#[derive(Debug, Deserialize)]
pub struct MarketEnvelope {
    pub market: RawMarket,
}

/// The subset of the upstream market object we read. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMarket {
    pub ticker: String,
    pub title: String,
    pub market_type: String,
    #[serde(flatten)]
    pub quote: RawQuote,
    pub close_time: String, // ISO-8601, usually "Z"-suffixed
    pub status: String,
    #[serde(default)]
    pub result: Option<String>,
}
