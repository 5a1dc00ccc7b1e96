//! Telemetry a runner publishes at every event so a control surface can read
//! `/status`, `/trades`, `/risk` (§6) without blocking on the runner's own
//! loop — the same `Arc<RwLock<_>>`-shared-state idiom `mqk-daemon`'s
//! `AppState` uses for its status snapshot.

use mqk_portfolio::PortfolioState;
use mqk_risk::RiskViolation;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct BotLiveState {
    pub portfolio: PortfolioState,
    pub risk_evaluations: Vec<RiskViolation>,
    pub kill_switch_activated: bool,
}

impl BotLiveState {
    pub fn new(portfolio: PortfolioState) -> Self {
        Self {
            portfolio,
            risk_evaluations: Vec::new(),
            kill_switch_activated: false,
        }
    }
}
