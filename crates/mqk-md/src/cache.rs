//! Process-wide, read-mostly historical-range cache (§5): concurrent reads
//! are cheap, insertion is serialised behind a single lock so two callers
//! racing on the same key don't double-fetch from the provider.

use std::collections::HashMap;
use std::sync::Mutex;

use mqk_schemas::MarketSnapshot;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub interval: String,
    pub start_ms: i64,
    pub end_ms: i64,
}

#[derive(Default)]
pub struct HistoricalCache {
    entries: Mutex<HashMap<CacheKey, Vec<MarketSnapshot>>>,
}

impl HistoricalCache {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Vec<MarketSnapshot>> {
        self.entries.lock().expect("historical cache mutex poisoned").get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, snapshots: Vec<MarketSnapshot>) {
        self.entries.lock().expect("historical cache mutex poisoned").insert(key, snapshots);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("historical cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mqk_schemas::Candle;

    fn snapshot(ts: i64) -> MarketSnapshot {
        MarketSnapshot::from_candle(Candle {
            timestamp_ms: ts,
            symbol: "BTCUSDT".into(),
            interval: "1m".into(),
            open: mqk_schemas::Micros::from_decimal(100.0),
            high: mqk_schemas::Micros::from_decimal(101.0),
            low: mqk_schemas::Micros::from_decimal(99.0),
            close: mqk_schemas::Micros::from_decimal(100.5),
            volume: mqk_schemas::Micros::from_decimal(1.0),
            quote_volume: None,
            trade_count: None,
            taker_buy_volume: None,
            taker_buy_quote_volume: None,
        })
    }

    fn key() -> CacheKey {
        CacheKey { symbol: "BTCUSDT".into(), interval: "1m".into(), start_ms: 0, end_ms: 60_000 }
    }

    #[test]
    fn miss_then_hit_after_insert() {
        let cache = HistoricalCache::new();
        assert!(cache.get(&key()).is_none());
        cache.insert(key(), vec![snapshot(0)]);
        assert_eq!(cache.get(&key()).unwrap().len(), 1);
    }
}
