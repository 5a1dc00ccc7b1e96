//! Canonical data model: `Candle`/`MarketSnapshot`, `Signal`, `Order`,
//! `Fill`, `Position`, and the closed sum types (`Side`, `OrderType`,
//! `TimeInForce`, `OrderStatus`) that every other crate in the workspace
//! builds on. All entities here are value-like and serialize to a plain
//! record form that round-trips exactly.

pub mod candle;
pub mod fill;
pub mod fixedpoint;
pub mod order;
pub mod position;
pub mod signal;
pub mod types;

pub use candle::{Candle, CandleError, MarketSnapshot};
pub use fill::Fill;
pub use fixedpoint::Micros;
pub use order::Order;
pub use position::Position;
pub use signal::{Signal, SignalError};
pub use types::{OrderStatus, OrderType, Side, TimeInForce};
