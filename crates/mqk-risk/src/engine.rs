use mqk_portfolio::{project_fill, PortfolioState};
use mqk_schemas::Fill;

use crate::{RiskRule, RiskViolation};

/// Ordered set of risk rules evaluated against a portfolio. Registration
/// order is preserved and every rule runs on every check — no short-circuit
/// — so callers always see the complete violation list.
pub struct RiskEngine {
    rules: Vec<Box<dyn RiskRule>>,
}

impl RiskEngine {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// A risk engine wired with the four canonical rules at common defaults.
    /// Callers needing different thresholds should build with `new()` and
    /// `add_rule` instead.
    pub fn with_canonical_rules(
        max_position_fraction: f64,
        max_drawdown_pct: f64,
        concentration_fraction: f64,
        daily_loss_limit: f64,
    ) -> Self {
        let mut engine = Self::new();
        engine.add_rule(Box::new(crate::rules::MaxPositionNotional {
            fraction: max_position_fraction,
        }));
        engine.add_rule(Box::new(crate::rules::MaxDrawdown {
            threshold_pct: max_drawdown_pct,
        }));
        engine.add_rule(Box::new(crate::rules::PositionConcentration {
            fraction: concentration_fraction,
        }));
        engine.add_rule(Box::new(crate::rules::DailyLossLimit {
            threshold: daily_loss_limit,
        }));
        engine
    }

    pub fn add_rule(&mut self, rule: Box<dyn RiskRule>) {
        self.rules.push(rule);
    }

    /// Drops every registered rule. Callers that want to keep the same rule
    /// set across a kill-switch restart should re-register after calling
    /// this.
    pub fn reset(&mut self) {
        self.rules.clear();
    }

    /// Evaluate every rule against the portfolio state a proposed fill
    /// would produce. Returns `(ok, violations)` — `ok` is `true` only if
    /// no rule fired.
    pub fn pre_trade(&self, state: &PortfolioState, proposed: &Fill) -> (bool, Vec<RiskViolation>) {
        let projected = project_fill(state, proposed);
        let violations = self.evaluate(&projected);
        (violations.is_empty(), violations)
    }

    /// Evaluate every rule against the live portfolio state. Returns
    /// `(critical, violations)` — `critical` is `true` if any violation is
    /// flagged critical, signalling the caller should engage the
    /// kill-switch.
    pub fn post_trade(&self, state: &PortfolioState) -> (bool, Vec<RiskViolation>) {
        let violations = self.evaluate(state);
        let critical = violations.iter().any(|v| v.critical);
        (critical, violations)
    }

    fn evaluate(&self, state: &PortfolioState) -> Vec<RiskViolation> {
        self.rules.iter().filter_map(|rule| rule.check(state)).collect()
    }
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new()
    }
}
