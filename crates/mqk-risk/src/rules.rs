//! The four canonical risk rules the spec requires every conforming
//! implementation to support.

use mqk_portfolio::{drawdown_pct, equity, total_position_value, PortfolioState};

use crate::{RiskRule, RiskViolation};

/// Proposed (or current) position notional must not exceed `fraction` of
/// equity.
pub struct MaxPositionNotional {
    pub fraction: f64,
}

impl RiskRule for MaxPositionNotional {
    fn name(&self) -> &str {
        "max_position_notional"
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn check(&self, state: &PortfolioState) -> Option<RiskViolation> {
        let eq = equity(state).to_decimal();
        if eq <= 0.0 {
            return None;
        }
        let notional = total_position_value(state).to_decimal();
        let threshold = self.fraction * eq;
        if notional > threshold {
            Some(RiskViolation {
                rule_name: self.name().to_string(),
                observed: notional,
                threshold,
                critical: false,
            })
        } else {
            None
        }
    }
}

/// Current drawdown from the running equity high-water mark must not
/// exceed `threshold_pct`. Critical — breach triggers the kill-switch.
pub struct MaxDrawdown {
    pub threshold_pct: f64,
}

impl RiskRule for MaxDrawdown {
    fn name(&self) -> &str {
        "max_drawdown"
    }

    fn is_critical(&self) -> bool {
        true
    }

    fn check(&self, state: &PortfolioState) -> Option<RiskViolation> {
        let observed = drawdown_pct(state.max_equity, equity(state));
        if observed > self.threshold_pct {
            Some(RiskViolation {
                rule_name: self.name().to_string(),
                observed,
                threshold: self.threshold_pct,
                critical: true,
            })
        } else {
            None
        }
    }
}

/// No single symbol's gross exposure may exceed `fraction` of equity.
pub struct PositionConcentration {
    pub fraction: f64,
}

impl RiskRule for PositionConcentration {
    fn name(&self) -> &str {
        "position_concentration"
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn check(&self, state: &PortfolioState) -> Option<RiskViolation> {
        let eq = equity(state).to_decimal();
        if eq <= 0.0 {
            return None;
        }
        let threshold = self.fraction * eq;
        for position in state.positions.values() {
            let mark = state.mark(&position.symbol);
            let notional = position.quantity.abs().mul_qty(mark).to_decimal();
            if notional > threshold {
                return Some(RiskViolation {
                    rule_name: self.name().to_string(),
                    observed: notional,
                    threshold,
                    critical: false,
                });
            }
        }
        None
    }
}

/// Realized + unrealized P&L since the session started (approximated by
/// `initial_cash`, the ledger's starting balance for this run) must not
/// drop below `-threshold`. Critical — breach triggers the kill-switch.
pub struct DailyLossLimit {
    pub threshold: f64,
}

impl RiskRule for DailyLossLimit {
    fn name(&self) -> &str {
        "daily_loss_limit"
    }

    fn is_critical(&self) -> bool {
        true
    }

    fn check(&self, state: &PortfolioState) -> Option<RiskViolation> {
        let pnl = equity(state).to_decimal() - state.initial_cash.to_decimal();
        if pnl < -self.threshold {
            Some(RiskViolation {
                rule_name: self.name().to_string(),
                observed: pnl,
                threshold: -self.threshold,
                critical: true,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mqk_schemas::{Micros, Position};

    fn state() -> PortfolioState {
        PortfolioState::new("s1".into(), Micros::from_decimal(10_000.0))
    }

    #[test]
    fn max_position_notional_flags_when_over_fraction() {
        let mut s = state();
        let mut pos = Position::flat("BTCUSDT".into(), 0);
        pos.quantity = Micros::from_decimal(100.0);
        pos.average_entry_price = Micros::from_decimal(100.0);
        s.positions.insert("BTCUSDT".into(), pos);
        s.marks.insert("BTCUSDT".into(), Micros::from_decimal(100.0));

        let rule = MaxPositionNotional { fraction: 0.5 };
        let violation = rule.check(&s).expect("should breach");
        assert_eq!(violation.rule_name, "max_position_notional");
        assert!(!violation.critical);
    }

    #[test]
    fn max_drawdown_is_critical_and_fires_past_threshold() {
        let mut s = state();
        s.max_equity = Micros::from_decimal(10_000.0);
        s.cash_balance = Micros::from_decimal(8_000.0);
        let rule = MaxDrawdown { threshold_pct: 15.0 };
        let violation = rule.check(&s).expect("20% drawdown should breach 15% threshold");
        assert!(violation.critical);
    }

    #[test]
    fn daily_loss_limit_triggers_on_breach_and_not_before() {
        let mut s = state();
        s.cash_balance = Micros::from_decimal(9_400.0);
        let rule = DailyLossLimit { threshold: 500.0 };
        assert!(rule.check(&s).is_some());

        let mut s2 = state();
        s2.cash_balance = Micros::from_decimal(9_600.0);
        assert!(rule.check(&s2).is_none());
    }

    #[test]
    fn position_concentration_flags_single_symbol_over_fraction() {
        let mut s = state();
        let mut pos = Position::flat("ETHUSDT".into(), 0);
        pos.quantity = Micros::from_decimal(50.0);
        pos.average_entry_price = Micros::from_decimal(100.0);
        s.positions.insert("ETHUSDT".into(), pos);
        s.marks.insert("ETHUSDT".into(), Micros::from_decimal(100.0));

        let rule = PositionConcentration { fraction: 0.3 };
        assert!(rule.check(&s).is_some());
    }
}
