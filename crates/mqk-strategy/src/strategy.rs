use mqk_schemas::{MarketSnapshot, Position, Signal};

use crate::params::{ParameterSpec, StrategyError, StrategyParams};

/// A trading strategy: stateless across calls (same inputs → same
/// signals), evaluated once per ingested market event against a bounded
/// trailing window (§4.1).
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Minimum window length this strategy needs to produce a signal.
    fn lookback(&self) -> usize;

    /// `market_window` holds the most recent events, oldest first, ending
    /// at the event currently being evaluated; `current_position` is the
    /// strategy's own position in the window's symbol, if any.
    fn generate_signals(
        &self,
        market_window: &[MarketSnapshot],
        current_position: Option<&Position>,
        params: &StrategyParams,
    ) -> Vec<Signal>;

    /// Pure check, callable without applying `params` to an instance.
    fn validate_parameters(&self, params: &StrategyParams) -> Result<(), StrategyError>;

    fn update_parameters(&mut self, params: StrategyParams) -> Result<(), StrategyError>;

    fn required_indicators(&self) -> Vec<String>;

    fn parameter_schema(&self) -> Vec<ParameterSpec>;
}

/// Lets a strategy instantiated dynamically (e.g. by name, from a
/// [`crate::StrategyRegistry`]) be used anywhere a concrete `S: Strategy` is
/// expected, such as `mqk_runner::StrategyRunner<S>`.
impl Strategy for Box<dyn Strategy> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn lookback(&self) -> usize {
        (**self).lookback()
    }

    fn generate_signals(
        &self,
        market_window: &[MarketSnapshot],
        current_position: Option<&Position>,
        params: &StrategyParams,
    ) -> Vec<Signal> {
        (**self).generate_signals(market_window, current_position, params)
    }

    fn validate_parameters(&self, params: &StrategyParams) -> Result<(), StrategyError> {
        (**self).validate_parameters(params)
    }

    fn update_parameters(&mut self, params: StrategyParams) -> Result<(), StrategyError> {
        (**self).update_parameters(params)
    }

    fn required_indicators(&self) -> Vec<String> {
        (**self).required_indicators()
    }

    fn parameter_schema(&self) -> Vec<ParameterSpec> {
        (**self).parameter_schema()
    }
}
