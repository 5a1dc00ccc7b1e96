//! Ledger façade — makes the weighted-average P&L rules explicit and
//! isolated from the append boundary.
//!
//! [`accounting`](crate::accounting) contains the raw position-accounting
//! mechanics. This module wraps them behind a typed, append-only `Ledger`
//! that enforces invariants on every append (no zero/negative quantity,
//! price, or fee; symbol must be non-empty), exposes only the minimal write
//! surface (`apply_fill`, `append_cash`), and provides read-only snapshot
//! views. Every `apply_fill` records a [`LedgerEntry`] so the whole
//! `PortfolioState` can be recomputed from the ledger alone — an integrity
//! check replays it and compares against the live incremental state.
//!
//! `Ledger` is deterministic and pure — no IO, no time, no randomness. Two
//! instances fed the same sequence of entries always produce identical
//! state.

use mqk_schemas::{Fill, Micros};

use crate::accounting::{apply_fill, recompute_from_ledger};
use crate::metrics;
use crate::types::{LedgerEntry, PortfolioState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    NonPositiveQty,
    NonPositivePrice,
    NegativeFee,
    EmptySymbol,
    OutOfOrderSeqNo { supplied: u64, last: u64 },
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveQty => write!(f, "ledger invariant: fill quantity must be > 0"),
            Self::NonPositivePrice => write!(f, "ledger invariant: fill price must be > 0"),
            Self::NegativeFee => write!(f, "ledger invariant: fill fee must be >= 0"),
            Self::EmptySymbol => write!(f, "ledger invariant: symbol must not be empty"),
            Self::OutOfOrderSeqNo { supplied, last } => {
                write!(f, "ledger invariant: seq_no {supplied} is not > last {last}")
            }
        }
    }
}

impl std::error::Error for LedgerError {}

/// Append-only ledger façade with invariant enforcement. Implements §4.2's
/// `apply_fill`/`update_mark_price`/`snapshot`/`can_open`/`reset`/`equity`.
#[derive(Clone, Debug)]
pub struct Ledger {
    state: PortfolioState,
    entries: Vec<LedgerEntry>,
    last_seq_no: u64,
    max_position_size_fraction: f64,
    min_order_size: Micros,
}

impl Ledger {
    pub fn new(strategy_id: impl Into<String>, initial_cash: Micros) -> Self {
        Self::with_limits(strategy_id, initial_cash, 0.5, Micros::ZERO)
    }

    pub fn with_limits(
        strategy_id: impl Into<String>,
        initial_cash: Micros,
        max_position_size_fraction: f64,
        min_order_size: Micros,
    ) -> Self {
        Ledger {
            state: PortfolioState::new(strategy_id.into(), initial_cash),
            entries: Vec::new(),
            last_seq_no: 0,
            max_position_size_fraction,
            min_order_size,
        }
    }

    // -- write surface --------------------------------------------------

    /// Append a fill and apply it to the position/cash state, enforcing
    /// invariants first (the ledger is not mutated on error). Recomputes
    /// `max_equity`/`max_drawdown_pct` afterward against current marks.
    pub fn apply_fill(&mut self, fill: Fill) -> Result<(), LedgerError> {
        Self::validate_fill(&fill)?;
        apply_fill(&mut self.state, &fill);
        self.state.trades.push(fill.clone());
        self.entries.push(LedgerEntry::Fill(fill));
        self.retrack_drawdown();
        Ok(())
    }

    /// Same as [`Ledger::apply_fill`] but enforces a strictly increasing
    /// sequence number, for callers applying a canonically ordered batch.
    pub fn apply_fill_seq(&mut self, fill: Fill, seq_no: u64) -> Result<(), LedgerError> {
        if seq_no <= self.last_seq_no && !self.entries.is_empty() {
            return Err(LedgerError::OutOfOrderSeqNo { supplied: seq_no, last: self.last_seq_no });
        }
        self.apply_fill(fill)?;
        self.last_seq_no = seq_no;
        Ok(())
    }

    /// Alias kept for call sites that apply a canonically-ordered batch
    /// produced by [`crate::ordering::apply_fills_canonical`].
    pub fn append_fill_seq(&mut self, fill: Fill, seq_no: u64) -> Result<(), LedgerError> {
        self.apply_fill_seq(fill, seq_no)
    }

    pub fn append_cash(&mut self, delta: Micros, reason: impl Into<String>, timestamp_ms: i64) -> Result<(), LedgerError> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(LedgerError::EmptySymbol);
        }
        self.state.cash_balance = self.state.cash_balance.saturating_add(delta);
        self.entries.push(LedgerEntry::Cash { delta, reason, timestamp_ms });
        self.retrack_drawdown();
        Ok(())
    }

    pub fn update_mark_price(&mut self, symbol: impl Into<String>, price: Micros) {
        self.state.marks.insert(symbol.into(), price);
        self.retrack_drawdown();
    }

    pub fn reset(&mut self) {
        let strategy_id = self.state.strategy_id.clone();
        let initial_cash = self.state.initial_cash;
        self.state = PortfolioState::new(strategy_id, initial_cash);
        self.entries.clear();
        self.last_seq_no = 0;
    }

    // -- read surface -----------------------------------------------------

    pub fn snapshot(&self) -> PortfolioState {
        self.state.clone()
    }

    pub fn equity(&self) -> Micros {
        metrics::equity(&self.state)
    }

    pub fn unrealized_pnl(&self) -> Micros {
        metrics::unrealized_pnl(&self.state)
    }

    pub fn realized_pnl(&self) -> Micros {
        self.state.positions.values().fold(Micros::ZERO, |acc, p| acc + p.realized_pnl)
    }

    pub fn cash_balance(&self) -> Micros {
        self.state.cash_balance
    }

    pub fn is_flat(&self, symbol: &str) -> bool {
        self.state.position(symbol).map(|p| p.is_flat()).unwrap_or(true)
    }

    pub fn qty_signed(&self, symbol: &str) -> Micros {
        self.state.position(symbol).map(|p| p.quantity).unwrap_or(Micros::ZERO)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// `can_open` policy (§4.2): reject if the notional plus an estimated
    /// fee would exceed cash on a BUY, reject if the resulting position
    /// would exceed `max_position_size` as a fraction of equity, reject if
    /// the order notional is below `min_order_size`.
    pub fn can_open(&self, symbol: &str, qty: Micros, price: Micros, is_buy: bool, fee_estimate: Micros) -> bool {
        let notional = qty.mul_qty(price);
        if notional < self.min_order_size {
            return false;
        }
        if is_buy && notional + fee_estimate > self.state.cash_balance {
            return false;
        }
        let equity = self.equity();
        if !equity.is_positive() {
            return false;
        }
        let current_qty = self.qty_signed(symbol);
        let current_notional = current_qty.abs().mul_qty(price);
        let resulting_notional = current_notional + notional;
        let limit = Micros::from_decimal(equity.to_decimal() * self.max_position_size_fraction);
        resulting_notional <= limit
    }

    /// Replay the stored ledger entries from scratch and compare against
    /// the incrementally maintained state. `true` if consistent.
    pub fn verify_integrity(&self) -> bool {
        let replayed = recompute_from_ledger(&self.state.strategy_id, self.state.initial_cash, &self.entries);
        replayed.cash_balance == self.state.cash_balance && replayed.positions == self.state.positions
    }

    // -- internal -----------------------------------------------------------

    fn retrack_drawdown(&mut self) {
        let equity = metrics::equity(&self.state);
        self.state.max_equity = self.state.max_equity.max(equity);
        let dd = metrics::drawdown_pct(self.state.max_equity, equity);
        if dd > self.state.max_drawdown_pct {
            self.state.max_drawdown_pct = dd;
        }
    }

    fn validate_fill(fill: &Fill) -> Result<(), LedgerError> {
        if fill.symbol.trim().is_empty() {
            return Err(LedgerError::EmptySymbol);
        }
        if !fill.quantity.is_positive() {
            return Err(LedgerError::NonPositiveQty);
        }
        if !fill.price.is_positive() {
            return Err(LedgerError::NonPositivePrice);
        }
        if fill.fee.is_negative() {
            return Err(LedgerError::NegativeFee);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mqk_schemas::Side;

    const M: i64 = mqk_schemas::Micros::SCALE;

    fn fill(symbol: &str, side: Side, qty: f64, price: f64, fee: f64, ts: i64) -> Fill {
        Fill {
            fill_id: format!("f{ts}"),
            order_id: "o1".into(),
            symbol: symbol.into(),
            side,
            quantity: Micros::from_decimal(qty),
            price: Micros::from_decimal(price),
            timestamp_ms: ts,
            fee: Micros::from_decimal(fee),
            fee_asset: "USDT".into(),
            is_maker: false,
            metadata: Default::default(),
        }
    }

    #[test]
    fn rejects_non_positive_qty() {
        let mut l = Ledger::new("s1", Micros::new(100_000 * M));
        let err = l.apply_fill(fill("AAPL", Side::Buy, 0.0, 100.0, 0.0, 1));
        assert_eq!(err, Err(LedgerError::NonPositiveQty));
        assert_eq!(l.entry_count(), 0);
    }

    #[test]
    fn rejects_empty_symbol() {
        let mut l = Ledger::new("s1", Micros::new(100_000 * M));
        let err = l.apply_fill(fill("", Side::Buy, 1.0, 100.0, 0.0, 1));
        assert_eq!(err, Err(LedgerError::EmptySymbol));
    }

    #[test]
    fn scenario_1_deterministic_market_order_fill() {
        let mut l = Ledger::new("s1", Micros::from_decimal(10_000.0));
        l.apply_fill(fill("BTCUSDT", Side::Buy, 1.0, 101.0, 0.101, 1)).unwrap();
        l.update_mark_price("BTCUSDT", Micros::from_decimal(100.0));
        assert!((l.cash_balance().to_decimal() - 9_898.899).abs() < 1e-6);
        assert!((l.equity().to_decimal() - 9_997.899).abs() < 1e-6);
    }

    #[test]
    fn scenario_2_round_trip_pnl() {
        let mut l = Ledger::new("s1", Micros::from_decimal(10_000.0));
        l.apply_fill(fill("BTCUSDT", Side::Buy, 1.0, 101.0, 0.101, 1)).unwrap();
        l.apply_fill(fill("BTCUSDT", Side::Sell, 1.0, 109.0, 0.109, 2)).unwrap();
        assert!((l.realized_pnl().to_decimal() - 8.0).abs() < 1e-6);
        assert!((l.cash_balance().to_decimal() - 10_007.79).abs() < 1e-6);
        assert!(l.is_flat("BTCUSDT"));
    }

    #[test]
    fn verify_integrity_passes_after_normal_operations() {
        let mut l = Ledger::new("s1", Micros::from_decimal(100_000.0));
        l.apply_fill(fill("AAPL", Side::Buy, 10.0, 100.0, 0.0, 1)).unwrap();
        l.apply_fill(fill("AAPL", Side::Sell, 5.0, 110.0, 0.0, 2)).unwrap();
        l.append_cash(Micros::from_decimal(500.0), "dividend", 3).unwrap();
        assert!(l.verify_integrity());
    }

    #[test]
    fn reset_returns_to_fresh_state() {
        let mut l = Ledger::new("s1", Micros::from_decimal(10_000.0));
        l.apply_fill(fill("AAPL", Side::Buy, 1.0, 100.0, 0.0, 1)).unwrap();
        l.reset();
        assert!(l.is_flat("AAPL"));
        assert_eq!(l.entry_count(), 0);
        assert_eq!(l.cash_balance(), Micros::from_decimal(10_000.0));
    }

    #[test]
    fn seq_no_must_be_strictly_increasing() {
        let mut l = Ledger::new("s1", Micros::from_decimal(10_000.0));
        l.apply_fill_seq(fill("AAPL", Side::Buy, 1.0, 100.0, 0.0, 1), 5).unwrap();
        let err = l.apply_fill_seq(fill("AAPL", Side::Buy, 1.0, 100.0, 0.0, 1), 5);
        assert_eq!(err, Err(LedgerError::OutOfOrderSeqNo { supplied: 5, last: 5 }));
    }

    #[test]
    fn can_open_rejects_below_min_order_size() {
        let l = Ledger::with_limits("s1", Micros::from_decimal(10_000.0), 0.5, Micros::from_decimal(10.0));
        assert!(!l.can_open("AAPL", Micros::from_decimal(0.01), Micros::from_decimal(100.0), true, Micros::ZERO));
    }

    #[test]
    fn can_open_rejects_insufficient_cash() {
        let l = Ledger::new("s1", Micros::from_decimal(100.0));
        assert!(!l.can_open("AAPL", Micros::from_decimal(10.0), Micros::from_decimal(100.0), true, Micros::ZERO));
    }

    #[test]
    fn max_drawdown_tracks_peak_to_trough() {
        let mut l = Ledger::new("s1", Micros::from_decimal(10_000.0));
        l.update_mark_price("AAPL", Micros::from_decimal(100.0));
        l.apply_fill(fill("AAPL", Side::Buy, 100.0, 91.0, 0.0, 1)).unwrap();
        assert!(l.snapshot().max_drawdown_pct > 0.0);
    }
}
