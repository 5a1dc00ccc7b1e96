//! Canonical OHLCV normalization: converts a [`RawBar`] into a
//! [`mqk_schemas::Candle`] with integer-micro prices and validated OHLC
//! relationships. No fetching, caching, or quality reporting here.

use std::fmt;

use mqk_schemas::{Candle, CandleError, Micros};

use crate::provider::RawBar;

#[derive(Debug, PartialEq, Eq)]
pub enum NormalizerError {
    EmptyPrice { field: &'static str },
    InvalidPrice { field: &'static str, raw: String },
    TooManyDecimalPlaces { field: &'static str, raw: String },
    OhlcViolation(String),
}

impl fmt::Display for NormalizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizerError::EmptyPrice { field } => write!(f, "price field '{field}' is empty"),
            NormalizerError::InvalidPrice { field, raw } => {
                write!(f, "price field '{field}' could not be parsed: '{raw}'")
            }
            NormalizerError::TooManyDecimalPlaces { field, raw } => {
                write!(f, "price field '{field}' has more than 6 decimal places (ambiguous micro conversion): '{raw}'")
            }
            NormalizerError::OhlcViolation(msg) => write!(f, "OHLC sanity violation: {msg}"),
        }
    }
}

impl std::error::Error for NormalizerError {}

impl From<CandleError> for NormalizerError {
    fn from(e: CandleError) -> Self {
        NormalizerError::OhlcViolation(e.to_string())
    }
}

/// Convert a decimal price string to integer micros deterministically, with
/// no floating-point at any stage.
pub fn price_to_micros(s: &str, field: &'static str) -> Result<i64, NormalizerError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(NormalizerError::EmptyPrice { field });
    }

    let (negative, digits) = if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = s.strip_prefix('+') {
        (false, rest)
    } else {
        (false, s)
    };

    if digits.is_empty() {
        return Err(NormalizerError::InvalidPrice { field, raw: s.to_string() });
    }

    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };

    let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(NormalizerError::InvalidPrice { field, raw: s.to_string() });
    }
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(NormalizerError::InvalidPrice { field, raw: s.to_string() });
    }
    if frac_part.len() > 6 {
        return Err(NormalizerError::TooManyDecimalPlaces { field, raw: s.to_string() });
    }

    let int_val: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| NormalizerError::InvalidPrice { field, raw: s.to_string() })?
    };

    let mut frac_padded = frac_part.to_string();
    while frac_padded.len() < 6 {
        frac_padded.push('0');
    }
    let frac_val: i64 = frac_padded.parse().map_err(|_| NormalizerError::InvalidPrice { field, raw: s.to_string() })?;

    let micros = int_val
        .checked_mul(1_000_000)
        .and_then(|v| v.checked_add(frac_val))
        .ok_or_else(|| NormalizerError::InvalidPrice { field, raw: s.to_string() })?;

    Ok(if negative { -micros } else { micros })
}

fn price(s: &str, field: &'static str) -> Result<Micros, NormalizerError> {
    Ok(Micros::new(price_to_micros(s, field)?))
}

/// Normalize a single [`RawBar`] into a [`Candle`], validating the OHLC
/// relationship via [`Candle::validate`].
pub fn normalize(bar: &RawBar) -> Result<Candle, NormalizerError> {
    let open = price(&bar.open, "open")?;
    let high = price(&bar.high, "high")?;
    let low = price(&bar.low, "low")?;
    let close = price(&bar.close, "close")?;
    let volume = price(&bar.volume, "volume")?;
    let quote_volume = bar.quote_volume.as_deref().map(|v| price(v, "quote_volume")).transpose()?;
    let taker_buy_volume =
        bar.taker_buy_volume.as_deref().map(|v| price(v, "taker_buy_volume")).transpose()?;
    let taker_buy_quote_volume = bar
        .taker_buy_quote_volume
        .as_deref()
        .map(|v| price(v, "taker_buy_quote_volume"))
        .transpose()?;

    let candle = Candle {
        timestamp_ms: bar.close_time_ms,
        symbol: bar.symbol.clone(),
        interval: bar.interval.clone(),
        open,
        high,
        low,
        close,
        volume,
        quote_volume,
        trade_count: bar.trade_count,
        taker_buy_volume,
        taker_buy_quote_volume,
    };
    candle.validate()?;
    Ok(candle)
}

/// Normalize a batch of [`RawBar`]s. Returns `Err` on the first bar that
/// fails to normalize.
pub fn normalize_all(bars: &[RawBar]) -> Result<Vec<Candle>, NormalizerError> {
    bars.iter().map(normalize).collect()
}

/// Sort candles in-place by `(symbol, interval, timestamp_ms)` — the
/// canonical order the quality gate and feed cache both assume.
pub fn sort_candles(candles: &mut [Candle]) {
    candles.sort_by(|a, b| {
        a.symbol
            .cmp(&b.symbol)
            .then_with(|| a.interval.cmp(&b.interval))
            .then_with(|| a.timestamp_ms.cmp(&b.timestamp_ms))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(open: &str, high: &str, low: &str, close: &str) -> RawBar {
        RawBar {
            symbol: "BTCUSDT".to_string(),
            interval: "1m".to_string(),
            close_time_ms: 1_700_000_000_000,
            open: open.to_string(),
            high: high.to_string(),
            low: low.to_string(),
            close: close.to_string(),
            volume: "10".to_string(),
            quote_volume: None,
            trade_count: None,
            taker_buy_volume: None,
            taker_buy_quote_volume: None,
        }
    }

    #[test]
    fn micros_whole_number() {
        assert_eq!(price_to_micros("100", "open").unwrap(), 100_000_000);
    }

    #[test]
    fn micros_six_decimal_places() {
        assert_eq!(price_to_micros("1.123456", "open").unwrap(), 1_123_456);
    }

    #[test]
    fn micros_rejects_seven_decimal_places() {
        assert!(matches!(
            price_to_micros("1.1234567", "open"),
            Err(NormalizerError::TooManyDecimalPlaces { .. })
        ));
    }

    #[test]
    fn micros_rejects_empty_string() {
        assert!(matches!(price_to_micros("", "open"), Err(NormalizerError::EmptyPrice { .. })));
    }

    #[test]
    fn normalize_accepts_valid_bar() {
        let candle = normalize(&raw("100.00", "105.00", "99.00", "103.00")).unwrap();
        assert_eq!(candle.close, Micros::from_decimal(103.0));
    }

    #[test]
    fn normalize_rejects_inverted_high_low() {
        assert!(normalize(&raw("100.00", "90.00", "99.00", "103.00")).is_err());
    }

    #[test]
    fn sort_candles_orders_by_symbol_then_interval_then_time() {
        let mut bars = vec![raw("1", "2", "0", "1"), raw("1", "2", "0", "1")];
        bars[0].close_time_ms = 200;
        bars[1].close_time_ms = 100;
        let mut candles: Vec<Candle> = bars.iter().map(|b| normalize(b).unwrap()).collect();
        sort_candles(&mut candles);
        assert_eq!(candles[0].timestamp_ms, 100);
        assert_eq!(candles[1].timestamp_ms, 200);
    }
}
