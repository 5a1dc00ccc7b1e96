//! `Signal`: the strategy's trading intent, produced once per strategy call
//! and immutable thereafter.

use serde::{Deserialize, Serialize};

use crate::fixedpoint::Micros;
use crate::types::{OrderType, Side, TimeInForce};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub side: Side,
    pub quantity: Micros,
    pub timestamp_ms: i64,
    pub strategy_id: String,
    pub order_type: OrderType,
    pub limit_price: Option<Micros>,
    pub stop_price: Option<Micros>,
    pub time_in_force: TimeInForce,
    pub metadata: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SignalError {
    NonPositiveQuantity,
    MissingLimitPrice,
    MissingStopPrice,
}

impl std::fmt::Display for SignalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalError::NonPositiveQuantity => write!(f, "signal quantity must be > 0"),
            SignalError::MissingLimitPrice => write!(f, "LIMIT/STOP_LIMIT signal requires limit_price > 0"),
            SignalError::MissingStopPrice => write!(f, "STOP_* signal requires stop_price > 0"),
        }
    }
}

impl std::error::Error for SignalError {}

impl Signal {
    /// `quantity > 0`; LIMIT requires `limit_price > 0`; STOP_* requires
    /// `stop_price > 0`; STOP_LIMIT requires both.
    pub fn validate(&self) -> Result<(), SignalError> {
        if !self.quantity.is_positive() {
            return Err(SignalError::NonPositiveQuantity);
        }
        let needs_limit = matches!(self.order_type, OrderType::Limit | OrderType::StopLimit);
        if needs_limit && !self.limit_price.is_some_and(Micros::is_positive) {
            return Err(SignalError::MissingLimitPrice);
        }
        if self.order_type.is_stop() && !self.stop_price.is_some_and(Micros::is_positive) {
            return Err(SignalError::MissingStopPrice);
        }
        Ok(())
    }
}
