//! Strategy trait and reference implementations: pure functions from a
//! bounded trailing market window plus the caller's current position to a
//! list of signals, with a declarative parameter schema for validation and
//! a registry for cataloguing/instantiating strategies by name.

mod mean_reversion;
mod params;
mod registry;
mod sma_crossover;
mod strategy;

pub use mean_reversion::MeanReversionStrategy;
pub use params::{param_or_default, validate_against_schema, ParameterSpec, StrategyError, StrategyParams};
pub use registry::{RegistryError, StrategyFactory, StrategyMeta, StrategyRegistry};
pub use sma_crossover::SmaCrossoverStrategy;
pub use strategy::Strategy;
