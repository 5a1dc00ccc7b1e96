//! Risk engine: an ordered set of pure rules evaluated against a portfolio
//! state, pre-trade (on a projected what-if fill) and post-trade (on the
//! live state after fills have been applied). No IO, no clock, no broker
//! calls — every rule is a deterministic function of `PortfolioState`.

mod engine;
mod rule;
mod rules;
mod violation;

pub use engine::RiskEngine;
pub use rule::RiskRule;
pub use rules::{DailyLossLimit, MaxDrawdown, MaxPositionNotional, PositionConcentration};
pub use violation::RiskViolation;
