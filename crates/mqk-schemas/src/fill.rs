//! `Fill`: an immutable execution record produced by the fill simulator.

use serde::{Deserialize, Serialize};

use crate::fixedpoint::Micros;
use crate::types::Side;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub fill_id: String,
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: Micros,
    pub price: Micros,
    pub timestamp_ms: i64,
    pub fee: Micros,
    pub fee_asset: String,
    pub is_maker: bool,
    pub metadata: std::collections::BTreeMap<String, String>,
}

impl Fill {
    /// `quantity × price`.
    pub fn notional(&self) -> Micros {
        self.quantity.mul_qty(self.price)
    }

    /// `−(notional + fee)` on BUY, `+(notional − fee)` on SELL.
    pub fn cash_delta(&self) -> Micros {
        match self.side {
            Side::Buy => -(self.notional() + self.fee),
            Side::Sell => self.notional() - self.fee,
        }
    }

    /// Debug-only invariant check: `quantity > 0`, `price > 0`, `fee >= 0`.
    pub fn is_well_formed(&self) -> bool {
        self.quantity.is_positive() && self.price.is_positive() && self.fee.is_non_negative()
    }
}
