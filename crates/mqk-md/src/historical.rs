//! Historical feed: paginated range fetch against a [`KlinesProvider`],
//! sorted strictly ascending, served from a process-wide cache keyed by
//! `(symbol, interval, start, end)` to avoid repeated provider calls, with
//! no duplicates introduced at the cache boundary (§4.6).

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use mqk_schemas::MarketSnapshot;
use tokio::sync::mpsc;

use crate::cache::{CacheKey, HistoricalCache};
use crate::feed::{ConnectionEvent, FeedError, MarketFeed};
use crate::normalizer;
use crate::provider::KlinesProvider;
use crate::rate_limit::TokenBucket;

const PAGE_LIMIT: u32 = 1000;

pub struct HistoricalFeed {
    provider: Arc<dyn KlinesProvider>,
    cache: Arc<HistoricalCache>,
    rate_limiter: Arc<TokenBucket>,
    symbol: String,
    interval: String,
    start_ms: i64,
    end_ms: i64,
    buffer: VecDeque<MarketSnapshot>,
}

impl HistoricalFeed {
    pub fn new(
        provider: Arc<dyn KlinesProvider>,
        cache: Arc<HistoricalCache>,
        rate_limiter: Arc<TokenBucket>,
        symbol: impl Into<String>,
        interval: impl Into<String>,
        start_ms: i64,
        end_ms: i64,
    ) -> Self {
        Self {
            provider,
            cache,
            rate_limiter,
            symbol: symbol.into(),
            interval: interval.into(),
            start_ms,
            end_ms,
            buffer: VecDeque::new(),
        }
    }

    fn cache_key(&self) -> CacheKey {
        CacheKey {
            symbol: self.symbol.clone(),
            interval: self.interval.clone(),
            start_ms: self.start_ms,
            end_ms: self.end_ms,
        }
    }

    async fn fetch_range(&self) -> Result<Vec<MarketSnapshot>, FeedError> {
        let mut cursor = self.start_ms;
        let mut out: Vec<MarketSnapshot> = Vec::new();
        let mut last_seen_ts: Option<i64> = None;

        loop {
            self.rate_limiter.acquire().await;
            let raw = self.provider.fetch_klines(&self.symbol, &self.interval, cursor, self.end_ms, PAGE_LIMIT).await?;
            if raw.is_empty() {
                break;
            }

            let mut candles =
                normalizer::normalize_all(&raw).map_err(|e| FeedError::Provider(crate::provider::ProviderError::Decode(e.to_string())))?;
            normalizer::sort_candles(&mut candles);

            let page_size = candles.len();
            let mut advanced = false;
            for candle in candles {
                // Cache boundary: never re-emit a timestamp already seen in
                // this range, even if the next page overlaps the last one.
                if last_seen_ts.is_some_and(|seen| candle.timestamp_ms <= seen) {
                    continue;
                }
                last_seen_ts = Some(candle.timestamp_ms);
                cursor = candle.timestamp_ms + 1;
                advanced = true;
                out.push(MarketSnapshot::from_candle(candle));
            }

            let last_page = (page_size as u32) < PAGE_LIMIT;
            if !advanced || last_page || cursor >= self.end_ms {
                break;
            }
        }

        Ok(out)
    }
}

#[async_trait]
impl MarketFeed for HistoricalFeed {
    async fn connect(&mut self) -> Result<(), FeedError> {
        let key = self.cache_key();
        if let Some(cached) = self.cache.get(&key) {
            self.buffer = cached.into();
            return Ok(());
        }
        let snapshots = self.fetch_range().await?;
        self.cache.insert(key, snapshots.clone());
        self.buffer = snapshots.into();
        Ok(())
    }

    async fn next_snapshot(&mut self) -> Result<Option<MarketSnapshot>, FeedError> {
        Ok(self.buffer.pop_front())
    }

    async fn disconnect(&mut self) {
        self.buffer.clear();
    }

    fn take_lifecycle_events(&mut self) -> Option<mpsc::Receiver<ConnectionEvent>> {
        None
    }
}
