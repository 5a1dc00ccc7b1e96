//! Weighted-average-entry-price position accounting.
//!
//! A single `Position` per symbol tracks one average entry price rather
//! than a FIFO lot stack: every fill either adds to the position at a new
//! weighted-average price, closes it (realizing P&L), or both (a reversal
//! that closes the old side and opens the new one at the fill price).

use mqk_schemas::{Fill, Position, Side};

use crate::PortfolioState;

/// Apply one fill's cash and position effects to `state`, per the
/// realized-P&L algorithm:
///
/// 1. `Δ = +qty` on BUY, `−qty` on SELL; `q1 = q0 + Δ`.
/// 2. Closing branch (`q0>0 ∧ Δ<0` or `q0<0 ∧ Δ>0`): realize P&L on
///    `close_qty = min(|q0|, |Δ|)`; if `|Δ| > |q0|` the position reverses
///    and the residual opens at `f.price`.
/// 3. Opening/adding branch: new weighted-average entry price.
/// 4. Cash update uses the Fill sign convention.
/// 5. `max_equity`/`max_drawdown_pct` are updated by the caller after this
///    returns, once mark-to-market is current.
pub fn apply_fill(state: &mut PortfolioState, f: &Fill) {
    apply_cash(state, f);

    let position = state
        .positions
        .entry(f.symbol.clone())
        .or_insert_with(|| Position::flat(f.symbol.clone(), f.timestamp_ms));

    let q0 = position.quantity;
    let delta = match f.side {
        Side::Buy => f.quantity,
        Side::Sell => -f.quantity,
    };

    let is_closing = (q0.is_positive() && delta.is_negative()) || (q0.is_negative() && delta.is_positive());

    if is_closing {
        let close_qty = q0.abs().min(delta.abs());
        let realized = if q0.is_positive() {
            close_qty.mul_qty(f.price - position.average_entry_price)
        } else {
            close_qty.mul_qty(position.average_entry_price - f.price)
        };
        position.realized_pnl += realized;

        let q1 = q0 + delta;
        if delta.abs() > q0.abs() {
            // Reversal: residual opens on the opposite side at the fill price.
            position.quantity = q1;
            position.average_entry_price = f.price;
            position.last_update = f.timestamp_ms;
        } else if q1.is_zero() {
            position.quantity = mqk_schemas::Micros::ZERO;
            position.average_entry_price = mqk_schemas::Micros::ZERO;
            position.last_update = f.timestamp_ms;
        } else {
            // Partial close: same side, reduced quantity, entry price unchanged.
            position.quantity = q1;
            position.last_update = f.timestamp_ms;
        }
    } else {
        // Opening or adding on the same side.
        let old_abs = q0.abs();
        let new_abs = old_abs + f.quantity;
        if new_abs.is_positive() {
            let weighted = old_abs.mul_qty(position.average_entry_price) + f.quantity.mul_qty(f.price);
            position.average_entry_price = mqk_schemas::Micros::new(
                ((weighted.raw() as i128 * mqk_schemas::Micros::SCALE as i128) / new_abs.raw() as i128) as i64,
            );
        }
        position.quantity = q0 + delta;
        position.last_update = f.timestamp_ms;
    }

    position.total_fee += f.fee;
    position.trade_count += 1;
}

fn apply_cash(state: &mut PortfolioState, f: &Fill) {
    state.cash_balance = state.cash_balance.saturating_add(f.cash_delta());
}

/// Pure full replay of a ledger entry sequence from an initial cash
/// balance, used only by the integrity check — never on the hot path.
pub fn recompute_from_ledger(
    strategy_id: &str,
    initial_cash: mqk_schemas::Micros,
    entries: &[crate::types::LedgerEntry],
) -> PortfolioState {
    let mut state = PortfolioState::new(strategy_id.to_string(), initial_cash);
    for entry in entries {
        match entry {
            crate::types::LedgerEntry::Fill(f) => apply_fill(&mut state, f),
            crate::types::LedgerEntry::Cash { delta, .. } => {
                state.cash_balance = state.cash_balance.saturating_add(*delta);
            }
        }
    }
    state
}
