//! Snapshot and final-report shapes the runner produces. `PortfolioState`
//! itself carries no history of its own (§4.2); the runner is what samples
//! it at a cadence and keeps the series.

use mqk_portfolio::PortfolioState;
use serde::Serialize;

/// A timestamped copy of the portfolio taken at the runner's configured
/// cadence, or at loop exit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunnerSnapshot {
    pub event_index: usize,
    pub timestamp_ms: i64,
    pub portfolio: PortfolioState,
    pub halted: bool,
}

/// Result of a completed, cancelled, or kill-switch-halted run.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub events_processed: usize,
    pub snapshots: Vec<RunnerSnapshot>,
    pub final_portfolio: PortfolioState,
    pub halted: bool,
    pub halt_reason: Option<String>,
}
