//! Market-data feed: historical (paginated REST klines), live (websocket
//! with reconnect/backoff), and paper (seeded deterministic generator)
//! modes behind one [`feed::MarketFeed`] contract, plus the provider
//! boundary, normalization, quality gate, rate limiting, and caching that
//! support the historical path (§4.6).

pub mod cache;
pub mod feed;
pub mod historical;
pub mod live;
pub mod normalizer;
pub mod paper;
pub mod provider;
pub mod quality;
pub mod rate_limit;

pub use cache::{CacheKey, HistoricalCache};
pub use feed::{ConnectionEvent, FeedError, MarketFeed};
pub use historical::HistoricalFeed;
pub use live::{LiveFeed, LiveFeedConfig};
pub use paper::{PaperFeed, PaperFeedConfig};
pub use provider::{KlinesProvider, ProviderError, RawBar, RestKlinesProvider};
pub use rate_limit::TokenBucket;
