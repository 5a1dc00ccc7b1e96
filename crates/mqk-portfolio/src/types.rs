//! `PortfolioState` and the append-only ledger entries it replays from.

use std::collections::BTreeMap;

use mqk_schemas::{Fill, Micros, Position};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LedgerEntry {
    Fill(Fill),
    Cash { delta: Micros, reason: String, timestamp_ms: i64 },
}

/// `(strategy_id, cash_balance, positions, max_equity, max_drawdown_pct, trades[])`.
/// `snapshots[]` of the literal spec are owned by the runner (§4.7), which
/// captures a `PortfolioState` copy at a cadence — not replicated here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub strategy_id: String,
    pub initial_cash: Micros,
    pub cash_balance: Micros,
    pub positions: BTreeMap<String, Position>,
    pub max_equity: Micros,
    pub max_drawdown_pct: f64,
    pub trades: Vec<Fill>,
    pub marks: BTreeMap<String, Micros>,
}

impl PortfolioState {
    pub fn new(strategy_id: String, initial_cash: Micros) -> Self {
        PortfolioState {
            strategy_id,
            initial_cash,
            cash_balance: initial_cash,
            positions: BTreeMap::new(),
            max_equity: initial_cash,
            max_drawdown_pct: 0.0,
            trades: Vec::new(),
            marks: BTreeMap::new(),
        }
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn mark(&self, symbol: &str) -> Micros {
        self.marks.get(symbol).copied().unwrap_or(Micros::ZERO)
    }
}
