//! Request and response types for the bot-control HTTP surface (§6).
//!
//! These types are `Serialize`/`Deserialize` so they can be JSON-encoded by
//! Axum and decoded by tests. No business logic lives here.

use mqk_risk::RiskViolation;
use mqk_runner::BotLiveState;
use mqk_runtime::BotState;
use mqk_schemas::{Fill, Position};
use mqk_strategy::StrategyParams;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Error body shared by every non-2xx response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// GET /api/bots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotListEntry {
    pub id: String,
    pub mode: String,
    pub status: BotState,
}

// ---------------------------------------------------------------------------
// POST /api/bots/{id}/start|stop|kill
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// ---------------------------------------------------------------------------
// GET /api/bots/{id}/status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotStatusResponse {
    pub pnl: f64,
    pub positions: Vec<Position>,
    pub balance: f64,
    pub equity: f64,
}

impl BotStatusResponse {
    pub fn from_live_state(live: &BotLiveState) -> Self {
        let equity = mqk_portfolio::equity(&live.portfolio);
        let pnl = equity - live.portfolio.initial_cash;
        Self {
            pnl: pnl.to_decimal(),
            positions: live.portfolio.positions.values().cloned().collect(),
            balance: live.portfolio.cash_balance.to_decimal(),
            equity: equity.to_decimal(),
        }
    }
}

// ---------------------------------------------------------------------------
// GET /api/bots/{id}/trades  — response body is the bare array
// ---------------------------------------------------------------------------

pub type TradesResponse = Vec<Fill>;

// ---------------------------------------------------------------------------
// GET /api/bots/{id}/risk
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskResponse {
    pub evaluations: Vec<RiskViolation>,
    pub kill_switch_activated: bool,
}

impl RiskResponse {
    pub fn from_live_state(live: &BotLiveState) -> Self {
        Self {
            evaluations: live.risk_evaluations.clone(),
            kill_switch_activated: live.kill_switch_activated,
        }
    }
}

// ---------------------------------------------------------------------------
// GET /api/metrics/global
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalMetricsResponse {
    pub bots_running: usize,
    pub total_equity: f64,
    pub total_pnl: f64,
    pub total_trades: usize,
}

// ---------------------------------------------------------------------------
// POST /api/bots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBotRequest {
    pub id: String,
    pub strategy: String,
    pub symbol: String,
    pub mode: String,
    pub initial_balance: f64,
    #[serde(default)]
    pub parameters: StrategyParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBotResponse {
    pub id: String,
    pub strategy: String,
    pub mode: String,
}
