//! Portfolio ledger & accounting model.
//!
//! Fill-driven ledger is the source of truth: every position change flows
//! through [`ledger::Ledger::apply_fill`], which delegates the weighted-
//! average-entry-price mechanics to `accounting` and appends an entry to an
//! append-only log that can be replayed to verify integrity. Pure
//! deterministic logic — no IO, no time, no broker wiring.

pub mod accounting;
mod metrics;
mod ordering;
mod types;

pub mod ledger;

pub use accounting::apply_fill;
pub use ledger::{Ledger, LedgerError};
pub use metrics::{drawdown_pct, equity, exposure, total_position_value, unrealized_pnl, ExposureMetrics};
pub use ordering::{apply_fills_canonical, sort_fills_canonical, TaggedFill};
pub use types::{LedgerEntry, PortfolioState};

pub use mqk_schemas::{Fill, Micros, Position, Side};

/// Non-mutating what-if: clone `state`, apply `fill` to the clone, and
/// return it — used by the risk engine's pre-trade check to evaluate the
/// position a proposed fill would produce without touching the live ledger.
pub fn project_fill(state: &PortfolioState, fill: &Fill) -> PortfolioState {
    let mut projected = state.clone();
    accounting::apply_fill(&mut projected, fill);
    projected.marks.insert(fill.symbol.clone(), fill.price);
    projected
}
