/// Tunables for [`crate::simulator::FillSimulator`]. Basis points and
/// fractions are expressed as plain `f64`; the simulator converts to
/// `Micros` only at the price/quantity boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatorConfig {
    /// Mean MARKET-order slippage, in basis points of mid, drawn uniformly
    /// within ±25% of this value.
    pub market_slippage_bps: f64,
    /// Probability [0,1] that a MARKET order partially fills rather than
    /// filling in full (ignored for FOK).
    pub market_partial_fill_probability: f64,
    /// Probability [0,1] that a fillable LIMIT order partially fills.
    /// The spec fixes this at half the market rate; exposed here so callers
    /// may override.
    pub limit_partial_fill_probability: f64,
    pub taker_fee_rate: f64,
    pub maker_fee_rate: f64,
    /// Latency, in milliseconds, added to `snapshot.timestamp_ms` for every
    /// produced fill.
    pub execution_latency_ms: i64,
}

impl SimulatorConfig {
    pub fn reference_defaults() -> Self {
        Self {
            market_slippage_bps: 5.0,
            market_partial_fill_probability: 0.1,
            limit_partial_fill_probability: 0.05,
            taker_fee_rate: 0.001,
            maker_fee_rate: 0.0004,
            execution_latency_ms: 50,
        }
    }
}
