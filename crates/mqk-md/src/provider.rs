//! Provider boundary: the raw bar shape returned by an upstream klines
//! endpoint and the trait historical/live feeds fetch through. No feed
//! lifecycle, caching, or rate-limiting logic belongs here.

use std::fmt;

use async_trait::async_trait;

/// A single OHLCV bar as returned verbatim by an upstream provider.
///
/// Prices stay as decimal strings so [`crate::normalizer`] can convert them
/// to integer micros deterministically, without floating-point rounding at
/// the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBar {
    pub symbol: String,
    pub interval: String,
    /// Bar close timestamp, epoch milliseconds.
    pub close_time_ms: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    pub quote_volume: Option<String>,
    pub trade_count: Option<u64>,
    pub taker_buy_volume: Option<String>,
    pub taker_buy_quote_volume: Option<String>,
}

#[derive(Debug)]
pub enum ProviderError {
    Transport(String),
    Api { code: Option<i64>, message: String },
    Decode(String),
    RateLimited,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Transport(msg) => write!(f, "transport error: {msg}"),
            ProviderError::Api { code: Some(c), message } => write!(f, "provider api error code={c}: {message}"),
            ProviderError::Api { code: None, message } => write!(f, "provider api error: {message}"),
            ProviderError::Decode(msg) => write!(f, "decode error: {msg}"),
            ProviderError::RateLimited => write!(f, "provider rate limit exceeded"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Upstream market-data provider contract: a single paginated klines fetch.
/// Implementations must be `Send + Sync` so a feed can hold a
/// `Box<dyn KlinesProvider>` across await points.
#[async_trait]
pub trait KlinesProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch up to `limit` (≤ 1000) bars for `symbol`/`interval` with close
    /// time in `[start_ms, end_ms)`, sorted ascending by the upstream API.
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        start_ms: i64,
        end_ms: i64,
        limit: u32,
    ) -> Result<Vec<RawBar>, ProviderError>;
}

/// Klines provider backed by a public REST endpoint shaped like Binance's
/// `/api/v3/klines`: query params `{symbol, interval, startTime, endTime,
/// limit}`, response an array of 12-element kline arrays.
#[derive(Debug, Clone)]
pub struct RestKlinesProvider {
    http: reqwest::Client,
    base_url: String,
}

impl RestKlinesProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn klines_url(&self) -> String {
        format!("{}/api/v3/klines", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl KlinesProvider for RestKlinesProvider {
    fn name(&self) -> &'static str {
        "rest-klines"
    }

    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        start_ms: i64,
        end_ms: i64,
        limit: u32,
    ) -> Result<Vec<RawBar>, ProviderError> {
        let limit = limit.min(1000);
        let resp = self
            .http
            .get(self.klines_url())
            .query(&[
                ("symbol", symbol.to_ascii_uppercase()),
                ("interval", interval.to_string()),
                ("startTime", start_ms.to_string()),
                ("endTime", end_ms.to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                code: Some(status.as_u16() as i64),
                message: body,
            });
        }

        let rows: Vec<Vec<serde_json::Value>> = resp
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        rows.into_iter()
            .map(|row| decode_kline_row(symbol, interval, &row))
            .collect()
    }
}

fn decode_kline_row(symbol: &str, interval: &str, row: &[serde_json::Value]) -> Result<RawBar, ProviderError> {
    let as_str = |i: usize| -> Result<String, ProviderError> {
        row.get(i)
            .and_then(|v| v.as_str().map(str::to_string).or_else(|| v.as_f64().map(|f| f.to_string())))
            .ok_or_else(|| ProviderError::Decode(format!("missing kline field at index {i}")))
    };
    let as_i64 = |i: usize| -> Result<i64, ProviderError> {
        row.get(i)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| ProviderError::Decode(format!("missing integer kline field at index {i}")))
    };

    Ok(RawBar {
        symbol: symbol.to_ascii_uppercase(),
        interval: interval.to_string(),
        close_time_ms: as_i64(6)?,
        open: as_str(1)?,
        high: as_str(2)?,
        low: as_str(3)?,
        close: as_str(4)?,
        volume: as_str(5)?,
        quote_volume: as_str(7).ok(),
        trade_count: as_i64(8).ok().map(|v| v as u64),
        taker_buy_volume: as_str(9).ok(),
        taker_buy_quote_volume: as_str(10).ok(),
    })
}
