use std::collections::BTreeMap;

use mqk_schemas::{MarketSnapshot, Micros, OrderType, Position, Side, Signal, TimeInForce};

use crate::params::{param_or_default, validate_against_schema, ParameterSpec, StrategyError, StrategyParams};
use crate::strategy::Strategy;

/// Reference strategy: trade the z-score of price against its own trailing
/// mean. Opens when the score breaches `entry_z` in either direction, closes
/// once it reverts inside `±exit_z` (§4.1).
pub struct MeanReversionStrategy {
    params: StrategyParams,
}

impl MeanReversionStrategy {
    pub fn new() -> Self {
        let schema = Self::schema();
        let mut params = StrategyParams::new();
        for spec in &schema {
            params.insert(spec.name.clone(), spec.default);
        }
        Self { params }
    }

    fn schema() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::new("window", 20.0, 5.0, 500.0, "trailing bars used for mean/stddev"),
            ParameterSpec::new("entry_z", 2.0, 0.1, 10.0, "z-score magnitude that opens a position"),
            ParameterSpec::new("exit_z", 0.5, 0.0, 10.0, "z-score magnitude inside which a position is flattened"),
            ParameterSpec::new("order_qty", 1.0, 0.000001, 1_000_000.0, "signal quantity"),
        ]
    }

    fn z_score(closes: &[f64]) -> Option<f64> {
        let n = closes.len();
        if n < 2 {
            return None;
        }
        let mean = closes.iter().sum::<f64>() / n as f64;
        let variance = closes.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n as f64;
        let stddev = variance.sqrt();
        if stddev == 0.0 {
            return None;
        }
        let last = *closes.last().expect("checked len above");
        Some((last - mean) / stddev)
    }

    fn signal(&self, side: Side, snapshot: &MarketSnapshot, order_qty: f64) -> Signal {
        Signal {
            symbol: snapshot.symbol().to_string(),
            side,
            quantity: Micros::from_decimal(order_qty),
            timestamp_ms: snapshot.timestamp_ms(),
            strategy_id: self.name().to_string(),
            order_type: OrderType::Market,
            limit_price: None,
            stop_price: None,
            time_in_force: TimeInForce::Gtc,
            metadata: BTreeMap::new(),
        }
    }
}

impl Default for MeanReversionStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for MeanReversionStrategy {
    fn name(&self) -> &str {
        "mean_reversion_zscore"
    }

    fn lookback(&self) -> usize {
        param_or_default(&self.params, &Self::schema(), "window") as usize
    }

    fn generate_signals(
        &self,
        market_window: &[MarketSnapshot],
        current_position: Option<&Position>,
        params: &StrategyParams,
    ) -> Vec<Signal> {
        let schema = Self::schema();
        let window = param_or_default(params, &schema, "window") as usize;
        let entry_z = param_or_default(params, &schema, "entry_z");
        let exit_z = param_or_default(params, &schema, "exit_z");
        let order_qty = param_or_default(params, &schema, "order_qty");

        if market_window.len() < window {
            return Vec::new();
        }

        let closes: Vec<f64> = market_window[market_window.len() - window..]
            .iter()
            .map(|s| s.close().to_decimal())
            .collect();
        let Some(z) = Self::z_score(&closes) else {
            return Vec::new();
        };

        let latest = market_window.last().expect("checked non-empty above");
        let is_long = current_position.map(|p| p.quantity.is_positive()).unwrap_or(false);
        let is_short = current_position.map(|p| p.quantity.is_negative()).unwrap_or(false);

        if (is_long || is_short) && z.abs() <= exit_z {
            let flatten_side = if is_long { Side::Sell } else { Side::Buy };
            return vec![self.signal(flatten_side, latest, order_qty)];
        }

        if !is_long && !is_short {
            if z < -entry_z {
                return vec![self.signal(Side::Buy, latest, order_qty)];
            }
            if z > entry_z {
                return vec![self.signal(Side::Sell, latest, order_qty)];
            }
        }

        Vec::new()
    }

    fn validate_parameters(&self, params: &StrategyParams) -> Result<(), StrategyError> {
        validate_against_schema(&Self::schema(), params)?;
        let entry_z = param_or_default(params, &Self::schema(), "entry_z");
        let exit_z = param_or_default(params, &Self::schema(), "exit_z");
        if exit_z >= entry_z {
            return Err(StrategyError::OutOfBounds {
                name: "exit_z".to_string(),
                value: exit_z,
                min: 0.0,
                max: entry_z,
            });
        }
        Ok(())
    }

    fn update_parameters(&mut self, params: StrategyParams) -> Result<(), StrategyError> {
        self.validate_parameters(&params)?;
        self.params = params;
        Ok(())
    }

    fn required_indicators(&self) -> Vec<String> {
        vec!["rolling_mean".to_string(), "rolling_stddev".to_string()]
    }

    fn parameter_schema(&self) -> Vec<ParameterSpec> {
        Self::schema()
    }
}
