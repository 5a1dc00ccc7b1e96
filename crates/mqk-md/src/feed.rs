//! The runner-facing feed contract (§4.6): one shape — `connect`, pull the
//! next snapshot, `disconnect` — shared by historical, live, and paper
//! modes. Connection lifecycle is surfaced on a side channel so the runner
//! can tell DISCONNECTED-then-reconnected apart from a stall.

use async_trait::async_trait;
use mqk_schemas::MarketSnapshot;
use tokio::sync::mpsc;

use crate::provider::ProviderError;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
    Reconnecting { attempt: u32 },
    Error(String),
    Heartbeat,
}

#[derive(Debug)]
pub enum FeedError {
    Provider(ProviderError),
    Closed,
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::Provider(e) => write!(f, "feed provider error: {e}"),
            FeedError::Closed => write!(f, "feed is closed"),
        }
    }
}

impl std::error::Error for FeedError {}

impl From<ProviderError> for FeedError {
    fn from(e: ProviderError) -> Self {
        FeedError::Provider(e)
    }
}

/// A market-data feed: historical (backtest), live (websocket), or paper
/// (simulated). The runner drives it with exactly these three calls per
/// §4.7's main loop.
#[async_trait]
pub trait MarketFeed: Send {
    /// Open the feed. For historical feeds this pre-fetches the whole
    /// requested range; for live/paper feeds this starts the background
    /// connection task.
    async fn connect(&mut self) -> Result<(), FeedError>;

    /// Pull the next snapshot, or `Ok(None)` once the feed is exhausted
    /// (historical) or has been disconnected for good (live/paper).
    async fn next_snapshot(&mut self) -> Result<Option<MarketSnapshot>, FeedError>;

    /// Tear down the connection. Idempotent.
    async fn disconnect(&mut self);

    /// Take ownership of the connection-lifecycle side channel. Returns
    /// `None` if already taken or the feed doesn't emit lifecycle events
    /// (historical feeds have no connection to report on).
    fn take_lifecycle_events(&mut self) -> Option<mpsc::Receiver<ConnectionEvent>>;
}
