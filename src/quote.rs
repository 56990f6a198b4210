// src/quote.rs
//! Quote normalizer: raw yes-side quote (integer cents) -> implied probability in [0, 1].
//!
//! Pure and side-effect free; it runs on every snapshot fetch.

use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// The price fields of an upstream quote, in integer cents (0–100) when present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuote {
    #[serde(default)]
    pub yes_bid: Option<i64>,
    #[serde(default)]
    pub yes_ask: Option<i64>,
    #[serde(default)]
    pub last_price: Option<i64>,
}

/// Which price tiers the normalizer may fall back through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceFallback {
    /// bid/ask midpoint, then last trade.
    #[default]
    TwoTier,
    /// bid/ask midpoint, then last trade, then yes_ask alone.
    ThreeTier,
}

impl PriceFallback {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "two-tier" | "2" => Some(PriceFallback::TwoTier),
            "three-tier" | "3" => Some(PriceFallback::ThreeTier),
            _ => None,
        }
    }
}

/// Derive the implied probability using the default two-tier fallback.
pub fn derive_implied_probability(quote: &RawQuote) -> Result<f64, ForecastError> {
    derive_with_fallback(quote, PriceFallback::TwoTier)
}

/// First applicable rule wins:
/// 1. both `yes_bid` and `yes_ask` -> midpoint / 100
/// 2. `last_price` -> last_price / 100
/// 3. (`ThreeTier` only) `yes_ask` -> yes_ask / 100
///
/// Any present field outside 0..=100 cents fails the whole quote.
pub fn derive_with_fallback(quote: &RawQuote, policy: PriceFallback) -> Result<f64, ForecastError> {
    let bid = cents("yes_bid", quote.yes_bid)?;
    let ask = cents("yes_ask", quote.yes_ask)?;
    let last = cents("last_price", quote.last_price)?;

    // inputs are within 0..=100, so every branch lands in [0, 1]
    match (bid, ask, last) {
        (Some(bid), Some(ask), _) => Ok(((bid + ask) as f64 / 2.0) / 100.0),
        (_, _, Some(last)) => Ok(last as f64 / 100.0),
        (_, Some(ask), None) if policy == PriceFallback::ThreeTier => Ok(ask as f64 / 100.0),
        _ => Err(ForecastError::NoUsablePrice(
            "no usable price found to derive implied probability".into(),
        )),
    }
}

fn cents(field: &str, value: Option<i64>) -> Result<Option<i64>, ForecastError> {
    match value {
        Some(c) if !(0..=100).contains(&c) => Err(ForecastError::NoUsablePrice(format!(
            "{field} {c} outside 0..=100 cents"
        ))),
        other => Ok(other),
    }
}
