//! Equity, exposure, and drawdown derived from a `PortfolioState`.

use mqk_schemas::Micros;

use crate::PortfolioState;

/// `Σ |qty| × average_entry_price` across all positions.
pub fn total_position_value(state: &PortfolioState) -> Micros {
    state
        .positions
        .values()
        .fold(Micros::ZERO, |acc, p| acc + p.notional())
}

/// `Σ qty × (mark − avg_entry)`, i.e. the sum of each position's
/// `unrealized_pnl` against its current mark.
pub fn unrealized_pnl(state: &PortfolioState) -> Micros {
    state.positions.values().fold(Micros::ZERO, |acc, p| {
        acc + p.unrealized_pnl(state.mark(&p.symbol))
    })
}

/// `cash + total_position_value + unrealized_pnl`.
pub fn equity(state: &PortfolioState) -> Micros {
    state.cash_balance + total_position_value(state) + unrealized_pnl(state)
}

/// `(max_equity − current_equity) / max_equity × 100`; zero if max_equity
/// is non-positive (should not happen once initial_cash > 0).
pub fn drawdown_pct(max_equity: Micros, current_equity: Micros) -> f64 {
    if !max_equity.is_positive() {
        return 0.0;
    }
    let max = max_equity.to_decimal();
    let cur = current_equity.to_decimal();
    ((max - cur) / max * 100.0).max(0.0)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExposureMetrics {
    pub gross: Micros,
    pub net: Micros,
}

/// `gross = Σ |qty| × mark`; `net = Σ qty × mark` (signed).
pub fn exposure(state: &PortfolioState) -> ExposureMetrics {
    let mut gross = Micros::ZERO;
    let mut net = Micros::ZERO;
    for p in state.positions.values() {
        let mark = state.mark(&p.symbol);
        gross += p.quantity.abs().mul_qty(mark);
        net += p.quantity.mul_qty(mark);
    }
    ExposureMetrics { gross, net }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mqk_schemas::Position;

    fn state_with_position(qty: f64, avg: f64, mark: f64, cash: f64) -> PortfolioState {
        let mut s = PortfolioState::new("s1".into(), Micros::from_decimal(cash));
        let mut pos = Position::flat("BTCUSDT".into(), 0);
        pos.quantity = Micros::from_decimal(qty);
        pos.average_entry_price = Micros::from_decimal(avg);
        s.positions.insert("BTCUSDT".into(), pos);
        s.marks.insert("BTCUSDT".into(), Micros::from_decimal(mark));
        s
    }

    #[test]
    fn equity_equals_cash_plus_notional_plus_unrealized() {
        let s = state_with_position(1.0, 101.0, 100.0, 9_898.899);
        let eq = equity(&s);
        assert!((eq.to_decimal() - 9_997.899).abs() < 1e-6);
    }

    #[test]
    fn drawdown_zero_at_new_high() {
        assert_eq!(drawdown_pct(Micros::from_decimal(100.0), Micros::from_decimal(110.0)), 0.0);
    }

    #[test]
    fn drawdown_scales_correctly() {
        let d = drawdown_pct(Micros::from_decimal(10_000.0), Micros::from_decimal(8_900.0));
        assert!((d - 11.0).abs() < 1e-6);
    }

    #[test]
    fn exposure_gross_and_net_for_short() {
        let s = state_with_position(-1.0, 100.0, 100.0, 0.0);
        let e = exposure(&s);
        assert!((e.gross.to_decimal() - 100.0).abs() < 1e-6);
        assert!((e.net.to_decimal() - (-100.0)).abs() < 1e-6);
    }
}
