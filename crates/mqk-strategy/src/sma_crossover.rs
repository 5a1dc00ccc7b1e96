use std::collections::BTreeMap;

use mqk_schemas::{MarketSnapshot, OrderType, Position, Side, Signal, TimeInForce};

use crate::params::{param_or_default, validate_against_schema, ParameterSpec, StrategyError, StrategyParams};
use crate::strategy::Strategy;

/// Reference strategy: BUY when the fast moving average crosses above the
/// slow one, SELL when it crosses below. Crossover is detected on the
/// transition between the window's last two points, not on steady-state
/// inequality, so a signal fires exactly once per crossing (§4.1).
pub struct SmaCrossoverStrategy {
    params: StrategyParams,
}

impl SmaCrossoverStrategy {
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
            ParameterSpec::new("fast_period", 10.0, 2.0, 500.0, "fast SMA period, in bars"),
            ParameterSpec::new("slow_period", 30.0, 3.0, 1000.0, "slow SMA period, in bars"),
            ParameterSpec::new("order_qty", 1.0, 0.000001, 1_000_000.0, "signal quantity"),
        ]
    }

    fn sma(closes: &[f64], period: usize) -> Option<f64> {
        if closes.len() < period || period == 0 {
            return None;
        }
        let slice = &closes[closes.len() - period..];
        Some(slice.iter().sum::<f64>() / period as f64)
    }
}

impl Default for SmaCrossoverStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for SmaCrossoverStrategy {
    fn name(&self) -> &str {
        "sma_crossover"
    }

    fn lookback(&self) -> usize {
        param_or_default(&self.params, &Self::schema(), "slow_period") as usize + 1
    }

    fn generate_signals(
        &self,
        market_window: &[MarketSnapshot],
        _current_position: Option<&Position>,
        params: &StrategyParams,
    ) -> Vec<Signal> {
        let schema = Self::schema();
        let fast_period = param_or_default(params, &schema, "fast_period") as usize;
        let slow_period = param_or_default(params, &schema, "slow_period") as usize;
        let order_qty = param_or_default(params, &schema, "order_qty");

        if market_window.len() < slow_period + 1 {
            return Vec::new();
        }

        let closes: Vec<f64> = market_window.iter().map(|s| s.close().to_decimal()).collect();
        let closes_prev = &closes[..closes.len() - 1];

        let (Some(fast_now), Some(slow_now), Some(fast_prev), Some(slow_prev)) = (
            Self::sma(&closes, fast_period),
            Self::sma(&closes, slow_period),
            Self::sma(closes_prev, fast_period),
            Self::sma(closes_prev, slow_period),
        ) else {
            return Vec::new();
        };

        let crossed_up = fast_prev <= slow_prev && fast_now > slow_now;
        let crossed_down = fast_prev >= slow_prev && fast_now < slow_now;

        let latest = market_window.last().expect("checked non-empty above");
        let side = if crossed_up {
            Side::Buy
        } else if crossed_down {
            Side::Sell
        } else {
            return Vec::new();
        };

        vec![Signal {
            symbol: latest.symbol().to_string(),
            side,
            quantity: mqk_schemas::Micros::from_decimal(order_qty),
            timestamp_ms: latest.timestamp_ms(),
            strategy_id: self.name().to_string(),
            order_type: OrderType::Market,
            limit_price: None,
            stop_price: None,
            time_in_force: TimeInForce::Gtc,
            metadata: BTreeMap::new(),
        }]
    }

    fn validate_parameters(&self, params: &StrategyParams) -> Result<(), StrategyError> {
        validate_against_schema(&Self::schema(), params)?;
        let fast = param_or_default(params, &Self::schema(), "fast_period");
        let slow = param_or_default(params, &Self::schema(), "slow_period");
        if fast >= slow {
            return Err(StrategyError::OutOfBounds {
                name: "fast_period".to_string(),
                value: fast,
                min: 0.0,
                max: slow,
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
        vec!["sma_fast".to_string(), "sma_slow".to_string()]
    }

    fn parameter_schema(&self) -> Vec<ParameterSpec> {
        Self::schema()
    }
}
