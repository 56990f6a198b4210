// src/market/client.rs
//! Market-data API client (`GET {base}/markets/{id}`, bearer auth).

use std::time::{Duration, Instant};

use chrono::Utc;
use metrics::{counter, histogram};
use reqwest::{Client, Url};
use tracing::{info, warn};

use super::types::{MarketEnvelope, MarketSnapshot, RawMarket};
use super::{snapshot_from_raw, SnapshotSource};
use crate::config::GatewayConfig;
use crate::error::ForecastError;
use crate::quote::PriceFallback;
use crate::telemetry;

const USER_AGENT: &str = "market-forecast-gateway/0.1";
const MAX_ERROR_BODY: usize = 512;

#[derive(Clone)]
pub struct KalshiClient {
    http: Client,
    base_url: Url,
    api_key: String,
    timeout: Duration,
    max_retries: u8,
    fallback: PriceFallback,
}

impl KalshiClient {
    pub fn new(cfg: &GatewayConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(cfg.connect_timeout())
            .timeout(cfg.request_timeout())
            .build()?;
        let base_url = Url::parse(&cfg.base_url)?;
        Ok(Self {
            http,
            base_url,
            api_key: cfg.api_key.clone(),
            timeout: cfg.request_timeout(),
            max_retries: cfg.max_retries,
            fallback: cfg.price_fallback,
        })
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_fallback(mut self, fallback: PriceFallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// `{base}/markets/{market_id}` with the id escaped as one path segment.
    pub fn market_url(&self, market_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segs) = url.path_segments_mut() {
            segs.pop_if_empty().push("markets").push(market_id);
        }
        url
    }

    /// Fetch the raw market object, retrying transient upstream failures when configured.
    pub async fn fetch_market(&self, market_id: &str) -> Result<RawMarket, ForecastError> {
        let url = self.market_url(market_id);
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(&url).await {
                Ok(m) => return Ok(m),
                Err(e) => match self.retry_backoff(attempt, &e) {
                    Some(backoff) => {
                        warn!(
                            target: "upstream",
                            market_id, attempt, error = %e, backoff_ms = backoff.as_millis() as u64,
                            "retrying market fetch"
                        );
                        tokio::time::sleep(backoff).await;
                    }
                    None => return Err(e),
                },
            }
        }
    }

    /// Delay before the next attempt, or `None` once `attempt` (1-based) used up the retry
    /// budget or `err` is not worth retrying. At most `max_retries + 1` attempts are made.
    fn retry_backoff(&self, attempt: u32, err: &ForecastError) -> Option<Duration> {
        if !(err.is_upstream() && err.is_retryable()) || attempt > u32::from(self.max_retries) {
            return None;
        }
        let shift = attempt.saturating_sub(1).min(6);
        Some(Duration::from_millis(250u64 << shift))
    }

    async fn fetch_once(&self, url: &Url) -> Result<RawMarket, ForecastError> {
        counter!("upstream_requests_total").increment(1);
        let started = Instant::now();

        let out = self.send(url).await;

        histogram!("upstream_fetch_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        if out.is_err() {
            counter!("upstream_errors_total").increment(1);
        }
        out
    }

    async fn send(&self, url: &Url) -> Result<RawMarket, ForecastError> {
        let mut req = self
            .http
            .get(url.clone())
            .bearer_auth(&self.api_key)
            .timeout(self.timeout);
        if let Some(id) = telemetry::current_request_id() {
            req = req.header("X-Request-Id", id);
        }

        let resp = req.send().await.map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(ForecastError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await.map_err(|e| self.classify(e))?;
        let envelope: MarketEnvelope = serde_json::from_slice(&bytes)
            .map_err(|e| ForecastError::UpstreamPayload(e.to_string()))?;
        Ok(envelope.market)
    }

    fn classify(&self, err: reqwest::Error) -> ForecastError {
        if err.is_timeout() {
            ForecastError::UpstreamTimeout(self.timeout)
        } else {
            ForecastError::UpstreamTransport(err.to_string())
        }
    }
}

#[async_trait::async_trait]
impl SnapshotSource for KalshiClient {
    async fn fetch_market_snapshot(&self, market_id: &str) -> Result<MarketSnapshot, ForecastError> {
        let raw = self.fetch_market(market_id).await?;
        let snap = snapshot_from_raw(raw, self.fallback, Utc::now())?;
        info!(
            target: "upstream",
            market_id = %snap.market_id,
            implied_probability = snap.implied_probability,
            status = %snap.status,
            "market snapshot fetched"
        );
        Ok(snap)
    }

    fn name(&self) -> &'static str {
        "kalshi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> KalshiClient {
        KalshiClient::new(&GatewayConfig::new("k").with_base_url(base)).unwrap()
    }

    #[test]
    fn retry_budget_is_bounded_even_at_u8_max() {
        let c = client("http://127.0.0.1:8080/").with_retries(u8::MAX);
        let e = ForecastError::UpstreamStatus {
            status: 503,
            body: String::new(),
        };

        let retried = (1..=1_000u32)
            .take_while(|&n| c.retry_backoff(n, &e).is_some())
            .count();
        assert_eq!(retried, 255, "255 retries means 256 attempts in total");
        assert_eq!(c.retry_backoff(256, &e), None);
        assert_eq!(c.retry_backoff(u32::MAX, &e), None);

        assert_eq!(c.retry_backoff(1, &e), Some(Duration::from_millis(250)));
        assert_eq!(c.retry_backoff(2, &e), Some(Duration::from_millis(500)));
        assert_eq!(c.retry_backoff(255, &e), Some(Duration::from_millis(16_000)));
    }

    #[test]
    fn no_retry_budget_or_permanent_errors_stop_at_once() {
        let e = ForecastError::UpstreamTransport("reset".into());
        assert_eq!(client("http://127.0.0.1:8080/").retry_backoff(1, &e), None);

        let c = client("http://127.0.0.1:8080/").with_retries(3);
        let not_found = ForecastError::UpstreamStatus {
            status: 404,
            body: String::new(),
        };
        assert_eq!(c.retry_backoff(1, &not_found), None);
        assert_eq!(c.retry_backoff(1, &ForecastError::NoUsablePrice("x".into())), None);
    }

    #[test]
    fn market_url_appends_escaped_segment() {
        let c = client("https://api.elections.kalshi.com/trade-api/v2");
        assert_eq!(
            c.market_url("KXHIGHNY-26FEB28-B44.5").as_str(),
            "https://api.elections.kalshi.com/trade-api/v2/markets/KXHIGHNY-26FEB28-B44.5"
        );
        let c = client("http://127.0.0.1:8080/");
        assert_eq!(
            c.market_url("a/b c").as_str(),
            "http://127.0.0.1:8080/markets/a%2Fb%20c"
        );
    }
}
