//! `Position`: single weighted-average-entry-price position record, owned
//! and mutated only by the portfolio ledger (`mqk-portfolio`).

use serde::{Deserialize, Serialize};

use crate::fixedpoint::Micros;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// Signed quantity in micros: long > 0, short < 0, flat == 0.
    pub quantity: Micros,
    pub average_entry_price: Micros,
    pub realized_pnl: Micros,
    pub total_fee: Micros,
    pub trade_count: u64,
    pub last_update: i64,
}

impl Position {
    pub fn flat(symbol: String, now_ms: i64) -> Self {
        Position {
            symbol,
            quantity: Micros::ZERO,
            average_entry_price: Micros::ZERO,
            realized_pnl: Micros::ZERO,
            total_fee: Micros::ZERO,
            trade_count: 0,
            last_update: now_ms,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }

    pub fn is_long(&self) -> bool {
        self.quantity.is_positive()
    }

    pub fn is_short(&self) -> bool {
        self.quantity.is_negative()
    }

    /// `Σ qty × (mark − avg_entry)` with shorts contributing
    /// `|qty| × (avg − mark)`; both forms reduce to the same signed formula.
    pub fn unrealized_pnl(&self, mark_price: Micros) -> Micros {
        if self.is_flat() {
            return Micros::ZERO;
        }
        self.quantity.mul_qty(mark_price - self.average_entry_price)
    }

    pub fn notional(&self) -> Micros {
        self.quantity.abs().mul_qty(self.average_entry_price)
    }
}
