//! Paper feed: a simulated live feed driven by a deterministic seeded RNG
//! walk around a configured starting price, shaped identically to the live
//! mode's subscription contract so the runner's stall-detection code path
//! is exercised the same way across modes — no transport, so reconnect and
//! backoff don't apply, but heartbeats are still emitted (§4.6).

use std::time::Duration;

use async_trait::async_trait;
use mqk_schemas::{Candle, MarketSnapshot, Micros};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;

use crate::feed::{ConnectionEvent, FeedError, MarketFeed};

const HEARTBEAT_EVERY_N_BARS: u32 = 20;

#[derive(Clone, Debug)]
pub struct PaperFeedConfig {
    pub symbol: String,
    pub interval: String,
    pub starting_price: f64,
    pub step_bps: f64,
    pub bar_period: Duration,
    pub seed: u64,
}

impl PaperFeedConfig {
    pub fn new(symbol: impl Into<String>, interval: impl Into<String>, starting_price: f64, seed: u64) -> Self {
        Self {
            symbol: symbol.into(),
            interval: interval.into(),
            starting_price,
            step_bps: 10.0,
            bar_period: Duration::from_millis(10),
            seed,
        }
    }
}

pub struct PaperFeed {
    config: PaperFeedConfig,
    snapshot_rx: Option<mpsc::Receiver<MarketSnapshot>>,
    lifecycle_tx: Option<mpsc::Sender<ConnectionEvent>>,
    lifecycle_rx: Option<mpsc::Receiver<ConnectionEvent>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl PaperFeed {
    pub fn new(config: PaperFeedConfig) -> Self {
        let (lifecycle_tx, lifecycle_rx) = mpsc::channel(64);
        Self { config, snapshot_rx: None, lifecycle_tx: Some(lifecycle_tx), lifecycle_rx: Some(lifecycle_rx), task: None }
    }
}

#[async_trait]
impl MarketFeed for PaperFeed {
    async fn connect(&mut self) -> Result<(), FeedError> {
        let (snapshot_tx, snapshot_rx) = mpsc::channel(256);
        self.snapshot_rx = Some(snapshot_rx);
        let lifecycle_tx = self.lifecycle_tx.clone().expect("lifecycle sender set in new()");
        let config = self.config.clone();

        self.task = Some(tokio::spawn(async move {
            let _ = lifecycle_tx.send(ConnectionEvent::Connected).await;
            let mut rng = StdRng::seed_from_u64(config.seed);
            let mut price = config.starting_price;
            let mut ticker = tokio::time::interval(config.bar_period);
            let mut bar_index: u32 = 0;
            let mut timestamp_ms: i64 = 0;

            loop {
                ticker.tick().await;
                let drift: f64 = rng.gen_range(-1.0..1.0) * config.step_bps / 10_000.0;
                price = (price * (1.0 + drift)).max(0.000_001);

                let candle = Candle {
                    timestamp_ms,
                    symbol: config.symbol.clone(),
                    interval: config.interval.clone(),
                    open: Micros::from_decimal(price),
                    high: Micros::from_decimal(price * 1.0005),
                    low: Micros::from_decimal(price * 0.9995),
                    close: Micros::from_decimal(price),
                    volume: Micros::from_decimal(1.0),
                    quote_volume: None,
                    trade_count: None,
                    taker_buy_volume: None,
                    taker_buy_quote_volume: None,
                };
                timestamp_ms += config.bar_period.as_millis() as i64;
                bar_index += 1;

                if snapshot_tx.send(MarketSnapshot::from_candle(candle)).await.is_err() {
                    return;
                }
                if bar_index % HEARTBEAT_EVERY_N_BARS == 0 {
                    let _ = lifecycle_tx.send(ConnectionEvent::Heartbeat).await;
                }
            }
        }));
        Ok(())
    }

    async fn next_snapshot(&mut self) -> Result<Option<MarketSnapshot>, FeedError> {
        match &mut self.snapshot_rx {
            Some(rx) => Ok(rx.recv().await),
            None => Err(FeedError::Closed),
        }
    }

    async fn disconnect(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.snapshot_rx = None;
    }

    fn take_lifecycle_events(&mut self) -> Option<mpsc::Receiver<ConnectionEvent>> {
        self.lifecycle_rx.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_seed_produces_identical_first_bars() {
        let mut feed_a = PaperFeed::new(PaperFeedConfig::new("BTCUSDT", "1m", 100.0, 7));
        let mut feed_b = PaperFeed::new(PaperFeedConfig::new("BTCUSDT", "1m", 100.0, 7));
        feed_a.connect().await.unwrap();
        feed_b.connect().await.unwrap();

        let a = feed_a.next_snapshot().await.unwrap().unwrap();
        let b = feed_b.next_snapshot().await.unwrap().unwrap();
        assert_eq!(a.close(), b.close());
        feed_a.disconnect().await;
        feed_b.disconnect().await;
    }

    #[tokio::test]
    async fn emits_a_heartbeat_on_the_lifecycle_channel() {
        let mut feed = PaperFeed::new(PaperFeedConfig::new("BTCUSDT", "1m", 100.0, 1));
        let mut events = feed.take_lifecycle_events().unwrap();
        feed.connect().await.unwrap();

        for _ in 0..(HEARTBEAT_EVERY_N_BARS as usize + 5) {
            feed.next_snapshot().await.unwrap();
        }
        let mut saw_heartbeat = false;
        while let Ok(event) = events.try_recv() {
            if event == ConnectionEvent::Heartbeat {
                saw_heartbeat = true;
                break;
            }
        }
        assert!(saw_heartbeat);
        feed.disconnect().await;
    }
}
