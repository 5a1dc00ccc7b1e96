//! `Order`: the mutable record tracking a `Signal` through its lifecycle.
//! Created by the execution engine; mutated only via `add_fill`, `cancel`,
//! `reject`. Its derived properties (`is_active`) are functions of the
//! record, not fields kept separately in sync.

use serde::{Deserialize, Serialize};

use crate::fill::Fill;
use crate::fixedpoint::Micros;
use crate::signal::Signal;
use crate::types::OrderStatus;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub signal: Signal,
    pub status: OrderStatus,
    pub created_at: i64,
    pub updated_at: i64,
    pub filled_quantity: Micros,
    pub remaining_quantity: Micros,
    pub average_fill_price: Micros,
    pub fills: Vec<Fill>,
    pub total_fee: Micros,
    pub rejection_reason: Option<String>,
}

impl Order {
    pub fn new(order_id: String, signal: Signal, now_ms: i64) -> Self {
        let quantity = signal.quantity;
        Order {
            order_id,
            signal,
            status: OrderStatus::New,
            created_at: now_ms,
            updated_at: now_ms,
            filled_quantity: Micros::ZERO,
            remaining_quantity: quantity,
            average_fill_price: Micros::ZERO,
            fills: Vec::new(),
            total_fee: Micros::ZERO,
            rejection_reason: None,
        }
    }

    pub fn quantity(&self) -> Micros {
        self.signal.quantity
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Append a fill, updating `filled_quantity`, `remaining_quantity`,
    /// `average_fill_price` (running weighted average), `total_fee`, and
    /// `status`. Does not decide TIF cancellation — the caller (fill
    /// simulator / execution engine) owns that per §4.3.
    pub fn add_fill(&mut self, fill: Fill, now_ms: i64) {
        let prior_filled = self.filled_quantity;
        let new_filled = prior_filled + fill.quantity;
        if new_filled.is_positive() {
            let weighted = prior_filled.mul_qty(self.average_fill_price) + fill.quantity.mul_qty(fill.price);
            self.average_fill_price = Micros::new(
                ((weighted.raw() as i128 * Micros::SCALE as i128) / new_filled.raw() as i128) as i64,
            );
        }
        self.filled_quantity = new_filled;
        self.remaining_quantity = (self.quantity() - self.filled_quantity).max(Micros::ZERO);
        self.total_fee += fill.fee;
        self.fills.push(fill);
        self.updated_at = now_ms;

        self.status = if self.remaining_quantity.raw() <= 0 {
            OrderStatus::Filled
        } else if self.filled_quantity.is_positive() {
            OrderStatus::PartiallyFilled
        } else {
            self.status
        };
    }

    pub fn reject(&mut self, reason: String, now_ms: i64) {
        self.status = OrderStatus::Rejected;
        self.rejection_reason = Some(reason);
        self.updated_at = now_ms;
    }

    pub fn cancel(&mut self, now_ms: i64) {
        self.status = OrderStatus::Cancelled;
        self.updated_at = now_ms;
    }

    /// Undo every fill applied during the current `process()` call, as
    /// required of a FOK order that did not fill completely (§4.3).
    pub fn undo_fills(&mut self, fills_to_undo: &[Fill], now_ms: i64) {
        let undo_ids: std::collections::HashSet<&str> =
            fills_to_undo.iter().map(|f| f.fill_id.as_str()).collect();
        self.fills.retain(|f| !undo_ids.contains(f.fill_id.as_str()));
        self.filled_quantity = Micros::ZERO;
        self.remaining_quantity = self.quantity();
        self.average_fill_price = Micros::ZERO;
        self.total_fee = self.fills.iter().fold(Micros::ZERO, |acc, f| acc + f.fee);
        self.status = OrderStatus::Cancelled;
        self.updated_at = now_ms;
    }
}
