//! Canonical OHLCV record and the market snapshot the fill simulator reads.

use serde::{Deserialize, Serialize};

use crate::fixedpoint::Micros;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp_ms: i64,
    pub symbol: String,
    pub interval: String,
    pub open: Micros,
    pub high: Micros,
    pub low: Micros,
    pub close: Micros,
    pub volume: Micros,
    pub quote_volume: Option<Micros>,
    pub trade_count: Option<u64>,
    pub taker_buy_volume: Option<Micros>,
    pub taker_buy_quote_volume: Option<Micros>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CandleError {
    NonPositivePrice,
    NegativeVolume,
    HighLowInverted,
}

impl std::fmt::Display for CandleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandleError::NonPositivePrice => write!(f, "candle price must be > 0"),
            CandleError::NegativeVolume => write!(f, "candle volume must be >= 0"),
            CandleError::HighLowInverted => {
                write!(f, "candle must satisfy low <= min(open,close) <= max(open,close) <= high")
            }
        }
    }
}

impl std::error::Error for CandleError {}

impl Candle {
    /// Validates `low ≤ min(open, close) ≤ max(open, close) ≤ high`,
    /// prices > 0, volume ≥ 0.
    pub fn validate(&self) -> Result<(), CandleError> {
        for p in [self.open, self.high, self.low, self.close] {
            if !p.is_positive() {
                return Err(CandleError::NonPositivePrice);
            }
        }
        if self.volume.is_negative() {
            return Err(CandleError::NegativeVolume);
        }
        let body_lo = self.open.min(self.close);
        let body_hi = self.open.max(self.close);
        if !(self.low <= body_lo && body_lo <= body_hi && body_hi <= self.high) {
            return Err(CandleError::HighLowInverted);
        }
        Ok(())
    }
}

/// A `Candle` extended with best bid/ask. When the feed does not supply
/// bid/ask, they are synthesized symmetrically around `close` using the
/// implementation-wide spread fraction ([`MarketSnapshot::DEFAULT_SPREAD_FRACTION`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub candle: Candle,
    pub bid: Micros,
    pub ask: Micros,
    pub spread: Micros,
}

impl MarketSnapshot {
    /// 0.1% of close, split evenly between bid and ask.
    pub const DEFAULT_SPREAD_FRACTION: f64 = 0.001;

    pub fn from_candle(candle: Candle) -> Self {
        Self::from_candle_with_quote(candle, None, None)
    }

    /// Build a snapshot from a candle, taking an explicit bid/ask where the
    /// feed supplied one and synthesizing the rest around `close`.
    pub fn from_candle_with_quote(candle: Candle, bid: Option<Micros>, ask: Option<Micros>) -> Self {
        match (bid, ask) {
            (Some(bid), Some(ask)) => {
                let spread = ask.saturating_sub(bid);
                MarketSnapshot { candle, bid, ask, spread }
            }
            _ => {
                let half_spread = Micros::new(
                    ((candle.close.raw() as f64) * Self::DEFAULT_SPREAD_FRACTION / 2.0) as i64,
                );
                let bid = bid.unwrap_or_else(|| candle.close.saturating_sub(half_spread));
                let ask = ask.unwrap_or_else(|| candle.close.saturating_add(half_spread));
                let spread = ask.saturating_sub(bid);
                MarketSnapshot { candle, bid, ask, spread }
            }
        }
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.candle.timestamp_ms
    }

    pub fn symbol(&self) -> &str {
        &self.candle.symbol
    }

    pub fn close(&self) -> Micros {
        self.candle.close
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp_ms: 1,
            symbol: "BTCUSDT".into(),
            interval: "1m".into(),
            open: Micros::from_decimal(open),
            high: Micros::from_decimal(high),
            low: Micros::from_decimal(low),
            close: Micros::from_decimal(close),
            volume: Micros::from_decimal(10.0),
            quote_volume: None,
            trade_count: None,
            taker_buy_volume: None,
            taker_buy_quote_volume: None,
        }
    }

    #[test]
    fn valid_candle_passes() {
        assert!(candle(100.0, 105.0, 95.0, 102.0).validate().is_ok());
    }

    #[test]
    fn inverted_high_low_rejected() {
        assert_eq!(candle(100.0, 90.0, 95.0, 102.0).validate(), Err(CandleError::HighLowInverted));
    }

    #[test]
    fn non_positive_price_rejected() {
        let mut c = candle(100.0, 105.0, 95.0, 102.0);
        c.low = Micros::ZERO;
        assert_eq!(c.validate(), Err(CandleError::NonPositivePrice));
    }

    #[test]
    fn snapshot_synthesizes_symmetric_quote_around_close() {
        let snap = MarketSnapshot::from_candle(candle(100.0, 105.0, 95.0, 100.0));
        let mid = (snap.bid.raw() + snap.ask.raw()) / 2;
        assert!((mid - snap.close().raw()).abs() <= 1);
        assert!(snap.ask > snap.bid);
    }

    #[test]
    fn snapshot_keeps_explicit_bid_ask() {
        let snap = MarketSnapshot::from_candle_with_quote(
            candle(100.0, 105.0, 95.0, 100.0),
            Some(Micros::from_decimal(99.0)),
            Some(Micros::from_decimal(101.0)),
        );
        assert_eq!(snap.bid, Micros::from_decimal(99.0));
        assert_eq!(snap.ask, Micros::from_decimal(101.0));
    }
}
