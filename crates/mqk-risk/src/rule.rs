use mqk_portfolio::PortfolioState;

use crate::RiskViolation;

/// One risk check evaluated against a `PortfolioState`. Implementations are
/// pure: no IO, no clock, no mutation of the state they inspect.
pub trait RiskRule: Send + Sync {
    fn name(&self) -> &str;

    /// `true` if a breach of this rule should trigger the kill-switch.
    fn is_critical(&self) -> bool;

    /// Returns `Some(violation)` if `state` breaches this rule, `None`
    /// otherwise. Callers decide what `state` represents — the live
    /// portfolio for a post-trade check, or a projected what-if state for
    /// a pre-trade check.
    fn check(&self, state: &PortfolioState) -> Option<RiskViolation>;
}
