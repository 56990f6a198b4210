// src/config/gateway.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use std::{env, fmt, fs, path::Path};

use crate::quote::PriceFallback;

pub const ENV_CONFIG_PATH: &str = "GATEWAY_CONFIG_PATH";
pub const ENV_API_KEY: &str = "KALSHI_API_KEY";
pub const ENV_BASE_URL: &str = "KALSHI_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "UPSTREAM_TIMEOUT_MS";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "UPSTREAM_CONNECT_TIMEOUT_MS";
pub const ENV_MAX_RETRIES: &str = "UPSTREAM_MAX_RETRIES";
pub const ENV_ENGINE: &str = "FORECAST_ENGINE";
pub const ENV_CI_HALF_WIDTH: &str = "FORECAST_CI_HALF_WIDTH";
pub const ENV_PRICE_FALLBACK: &str = "PRICE_FALLBACK";
pub const ENV_METRICS_ENABLED: &str = "METRICS_ENABLED";

pub const DEFAULT_BASE_URL: &str = "https://api.elections.kalshi.com/trade-api/v2";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_connect_timeout_ms() -> u64 {
    4_000
}
fn default_ci_half_width() -> f64 {
    0.10
}

/// Which forecast engine backs `/forecast`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Constant 0.5 with [0.3, 0.7]; ignores upstream data.
    #[default]
    Stub,
    /// Implied probability of a live market snapshot.
    Market,
}

impl FromStr for EngineKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stub" => Ok(EngineKind::Stub),
            "market" => Ok(EngineKind::Market),
            other => bail!("Unsupported forecast engine: {other}"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Bearer token for the market-data API. In a config file, "ENV" means: read from KALSHI_API_KEY.
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Extra attempts after the first failed upstream call. 0 = no retries.
    #[serde(default)]
    pub max_retries: u8,
    #[serde(default)]
    pub engine: EngineKind,
    /// Half width of the interval the market engine puts around its probability.
    #[serde(default = "default_ci_half_width")]
    pub ci_half_width: f64,
    #[serde(default)]
    pub price_fallback: PriceFallback,
    #[serde(default)]
    pub metrics_enabled: bool,
}

// api_key stays out of Debug output
impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key_len", &self.api_key.len())
            .field("base_url", &self.base_url)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("max_retries", &self.max_retries)
            .field("engine", &self.engine)
            .field("ci_half_width", &self.ci_half_width)
            .field("price_fallback", &self.price_fallback)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl GatewayConfig {
    /// Defaults everywhere except the credential.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_retries: 0,
            engine: EngineKind::default(),
            ci_half_width: default_ci_half_width(),
            price_fallback: PriceFallback::default(),
            metrics_enabled: false,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Resolve config:
    /// 1) file at $GATEWAY_CONFIG_PATH (TOML or JSON)
    /// 2) process environment
    pub fn load() -> Result<Self> {
        match env::var(ENV_CONFIG_PATH) {
            Ok(p) if !p.trim().is_empty() => Self::load_from_file(p.trim()),
            _ => Self::from_env(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = env::var(ENV_API_KEY).unwrap_or_default();
        let mut cfg = Self::new(api_key.trim());

        if let Ok(url) = env::var(ENV_BASE_URL) {
            if !url.trim().is_empty() {
                cfg.base_url = url.trim().to_string();
            }
        }
        if let Some(v) = env_parse::<u64>(ENV_TIMEOUT_MS)? {
            cfg.request_timeout_ms = v;
        }
        if let Some(v) = env_parse::<u64>(ENV_CONNECT_TIMEOUT_MS)? {
            cfg.connect_timeout_ms = v;
        }
        if let Some(v) = env_parse::<u8>(ENV_MAX_RETRIES)? {
            cfg.max_retries = v;
        }
        if let Some(v) = env_parse::<EngineKind>(ENV_ENGINE)? {
            cfg.engine = v;
        }
        if let Some(v) = env_parse::<f64>(ENV_CI_HALF_WIDTH)? {
            cfg.ci_half_width = v;
        }
        if let Ok(raw) = env::var(ENV_PRICE_FALLBACK) {
            cfg.price_fallback = PriceFallback::parse(&raw)
                .ok_or_else(|| anyhow!("{ENV_PRICE_FALLBACK} must be two-tier or three-tier"))?;
        }
        cfg.metrics_enabled = env::var(ENV_METRICS_ENABLED)
            .map(|v| v.trim() == "1" || v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        cfg.finish()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading gateway config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let mut cfg: GatewayConfig = if ext == "json" {
            serde_json::from_str(&data).context("parsing gateway config JSON")?
        } else {
            toml::from_str(&data).context("parsing gateway config TOML")?
        };

        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = env::var(ENV_API_KEY)
                .map_err(|_| anyhow!("Missing {ENV_API_KEY} env var"))?;
        }

        cfg.finish()
    }

    fn finish(mut self) -> Result<Self> {
        self.api_key = self.api_key.trim().to_string();
        if self.api_key.is_empty() {
            bail!("{ENV_API_KEY} not set");
        }
        if self.request_timeout_ms == 0 {
            bail!("upstream request timeout must be > 0 ms");
        }
        reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("invalid market-data base URL {:?}", self.base_url))?;

        // Sanitize interval width instead of failing
        if !self.ci_half_width.is_finite() || !(0.0..=0.5).contains(&self.ci_half_width) {
            self.ci_half_width = default_ci_half_width();
        }
        Ok(self)
    }
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("invalid value for {name}: {e}")),
        _ => Ok(None),
    }
}
