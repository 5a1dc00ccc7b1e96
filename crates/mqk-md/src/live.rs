//! Live feed: a websocket subscription that reconnects on disconnect with
//! exponential backoff capped at a configured maximum, restores prior
//! subscriptions after reconnect, and emits a heartbeat so the runner can
//! detect stalls (§4.6). Connection lifecycle is surfaced on a side channel.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use mqk_schemas::{Candle, MarketSnapshot, Micros};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::feed::{ConnectionEvent, FeedError, MarketFeed};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Clone, Debug)]
pub struct LiveFeedConfig {
    pub ws_url: String,
    pub symbols: Vec<String>,
    pub interval: String,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl LiveFeedConfig {
    pub fn new(ws_url: impl Into<String>, symbols: Vec<String>, interval: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            symbols,
            interval: interval.into(),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

#[derive(Deserialize)]
struct WsKlineEvent {
    #[serde(rename = "k")]
    kline: WsKlinePayload,
}

#[derive(Deserialize)]
struct WsKlinePayload {
    #[serde(rename = "t")]
    open_time_ms: i64,
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "i")]
    interval: String,
    #[serde(rename = "o")]
    open: String,
    #[serde(rename = "h")]
    high: String,
    #[serde(rename = "l")]
    low: String,
    #[serde(rename = "c")]
    close: String,
    #[serde(rename = "v")]
    volume: String,
}

fn micros(s: &str) -> Micros {
    Micros::from_decimal(s.parse().unwrap_or(0.0))
}

/// Live websocket feed. Runs a background reconnect-loop task once
/// `connect` is called; snapshots flow back over an internal channel that
/// `next_snapshot` drains.
pub struct LiveFeed {
    config: LiveFeedConfig,
    snapshot_rx: Option<mpsc::Receiver<MarketSnapshot>>,
    lifecycle_tx: Option<mpsc::Sender<ConnectionEvent>>,
    lifecycle_rx: Option<mpsc::Receiver<ConnectionEvent>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl LiveFeed {
    pub fn new(config: LiveFeedConfig) -> Self {
        let (lifecycle_tx, lifecycle_rx) = mpsc::channel(64);
        Self {
            config,
            snapshot_rx: None,
            lifecycle_tx: Some(lifecycle_tx),
            lifecycle_rx: Some(lifecycle_rx),
            task: None,
        }
    }

    fn subscribe_message(&self) -> String {
        let params: Vec<String> =
            self.config.symbols.iter().map(|s| format!("{}@kline_{}", s.to_ascii_lowercase(), self.config.interval)).collect();
        serde_json::json!({ "method": "SUBSCRIBE", "params": params, "id": 1 }).to_string()
    }
}

#[async_trait]
impl MarketFeed for LiveFeed {
    async fn connect(&mut self) -> Result<(), FeedError> {
        let (snapshot_tx, snapshot_rx) = mpsc::channel(256);
        self.snapshot_rx = Some(snapshot_rx);
        let lifecycle_tx = self.lifecycle_tx.clone().expect("lifecycle sender set in new()");
        let config = self.config.clone();
        let subscribe_msg = self.subscribe_message();

        self.task = Some(tokio::spawn(async move {
            run_reconnect_loop(config, subscribe_msg, snapshot_tx, lifecycle_tx).await;
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

async fn run_reconnect_loop(
    config: LiveFeedConfig,
    subscribe_msg: String,
    snapshot_tx: mpsc::Sender<MarketSnapshot>,
    lifecycle_tx: mpsc::Sender<ConnectionEvent>,
) {
    let mut backoff = config.initial_backoff;
    let mut attempt: u32 = 0;

    loop {
        match tokio_tungstenite::connect_async(&config.ws_url).await {
            Ok((mut ws, _)) => {
                attempt = 0;
                backoff = config.initial_backoff;
                let _ = lifecycle_tx.send(ConnectionEvent::Connected).await;
                if ws.send(Message::Text(subscribe_msg.clone())).await.is_err() {
                    let _ = lifecycle_tx.send(ConnectionEvent::Disconnected).await;
                    continue;
                }

                let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
                loop {
                    tokio::select! {
                        msg = ws.next() => {
                            match msg {
                                Some(Ok(Message::Text(text))) => {
                                    if let Ok(event) = serde_json::from_str::<WsKlineEvent>(&text) {
                                        let candle = Candle {
                                            timestamp_ms: event.kline.open_time_ms,
                                            symbol: event.kline.symbol,
                                            interval: event.kline.interval,
                                            open: micros(&event.kline.open),
                                            high: micros(&event.kline.high),
                                            low: micros(&event.kline.low),
                                            close: micros(&event.kline.close),
                                            volume: micros(&event.kline.volume),
                                            quote_volume: None,
                                            trade_count: None,
                                            taker_buy_volume: None,
                                            taker_buy_quote_volume: None,
                                        };
                                        if snapshot_tx.send(MarketSnapshot::from_candle(candle)).await.is_err() {
                                            return;
                                        }
                                    }
                                }
                                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                                Some(Ok(Message::Close(_))) | None => break,
                                Some(Err(e)) => {
                                    let _ = lifecycle_tx.send(ConnectionEvent::Error(e.to_string())).await;
                                    break;
                                }
                                _ => {}
                            }
                        }
                        _ = heartbeat.tick() => {
                            let _ = lifecycle_tx.send(ConnectionEvent::Heartbeat).await;
                        }
                    }
                }
                let _ = lifecycle_tx.send(ConnectionEvent::Disconnected).await;
            }
            Err(e) => {
                let _ = lifecycle_tx.send(ConnectionEvent::Error(e.to_string())).await;
            }
        }

        attempt += 1;
        let _ = lifecycle_tx.send(ConnectionEvent::Reconnecting { attempt }).await;
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(config.max_backoff);
    }
}
