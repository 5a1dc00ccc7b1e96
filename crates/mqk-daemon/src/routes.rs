//! Axum router and all HTTP handlers for mqk-daemon's bot-control surface
//! (§6). `build_router` is the single entry point; `main.rs` calls it and
//! attaches middleware layers. All handlers are `pub(crate)` so the scenario
//! tests in `tests/` can compose the router directly.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use mqk_execution::{ExecutionEngine, FillSimulator, SimulatorConfig};
use mqk_md::{PaperFeed, PaperFeedConfig};
use mqk_portfolio::{equity, Ledger, Micros};
use mqk_risk::RiskEngine;
use mqk_runner::StrategyRunner;
use mqk_strategy::Strategy;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    api_types::{
        BotListEntry, BotStatusResponse, CreateBotRequest, CreateBotResponse, ErrorResponse,
        GlobalMetricsResponse, MessageResponse, RiskResponse, TradesResponse,
    },
    state::AppState,
};

/// How long `POST /api/bots/{id}/stop` waits for the runner to actually
/// terminate before giving up and returning anyway.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Canonical paper-feed starting price and bar interval used when a bot is
/// created through the control surface — the request body (§6) carries no
/// feed-shape fields beyond `symbol`, so these mirror the values the
/// reference strategies are exercised against elsewhere in this workspace.
const PAPER_STARTING_PRICE: f64 = 100.0;
const PAPER_INTERVAL: &str = "1m";

/// Risk thresholds applied to every bot created through the control
/// surface. The request body (§6) carries no risk-rule fields, so these are
/// a fixed, conservative default rather than something a caller can loosen.
const MAX_POSITION_FRACTION: f64 = 0.5;
const MAX_DRAWDOWN_PCT: f64 = 20.0;
const CONCENTRATION_FRACTION: f64 = 0.6;
const DAILY_LOSS_LIMIT: f64 = 0.1;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/api/bots", get(list_bots).post(create_bot))
        .route("/api/bots/:id/start", post(start_bot))
        .route("/api/bots/:id/stop", post(stop_bot))
        .route("/api/bots/:id/kill", post(kill_bot))
        .route("/api/bots/:id/status", get(bot_status))
        .route("/api/bots/:id/trades", get(bot_trades))
        .route("/api/bots/:id/risk", get(bot_risk))
        .route("/api/metrics/global", get(global_metrics))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
    version: &'static str,
}

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /api/bots
// ---------------------------------------------------------------------------

pub(crate) async fn list_bots(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let entries: Vec<BotListEntry> = st
        .bots
        .status()
        .await
        .into_iter()
        .map(|s| BotListEntry { id: s.id, mode: s.mode, status: s.state })
        .collect();
    (StatusCode::OK, Json(entries))
}

// ---------------------------------------------------------------------------
// POST /api/bots
// ---------------------------------------------------------------------------

pub(crate) async fn create_bot(
    State(st): State<Arc<AppState>>,
    Json(body): Json<CreateBotRequest>,
) -> Response {
    if body.id.trim().is_empty() {
        return bad_request("bot id must not be empty");
    }
    if st.bots.contains(&body.id) {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse { error: format!("bot '{}' already exists", body.id) }),
        )
            .into_response();
    }
    if body.mode != "paper" {
        return bad_request(&format!(
            "mode '{}' is not supported; only 'paper' bots can be created through this surface",
            body.mode
        ));
    }
    if body.initial_balance <= 0.0 {
        return bad_request("initial_balance must be positive");
    }

    let strategy = match st.registry.instantiate(&body.strategy) {
        Ok(strategy) => strategy,
        Err(e) => return bad_request(&e.to_string()),
    };
    if let Err(e) = strategy.validate_parameters(&body.parameters) {
        return bad_request(&e.to_string());
    }

    let ledger = Ledger::new(body.id.clone(), Micros::from_decimal(body.initial_balance));
    let risk = RiskEngine::with_canonical_rules(
        MAX_POSITION_FRACTION,
        MAX_DRAWDOWN_PCT,
        CONCENTRATION_FRACTION,
        DAILY_LOSS_LIMIT,
    );
    let seed = seed_from_id(&body.id);
    let simulator = FillSimulator::new(SimulatorConfig::reference_defaults(), seed);
    let execution = ExecutionEngine::new(ledger, risk, simulator);

    let feed = PaperFeed::new(PaperFeedConfig::new(
        body.symbol.clone(),
        PAPER_INTERVAL,
        PAPER_STARTING_PRICE,
        seed,
    ));

    let mut runner = StrategyRunner::new(
        strategy,
        Box::new(feed),
        execution,
        body.parameters.clone(),
        body.symbol.clone(),
    );
    if let Some((writer, run_id)) = st.audit_writer_for(&body.id) {
        runner = runner.with_audit(writer, run_id);
    }

    let strategy_name = runner.strategy_name().to_string();
    st.bots.add(body.id.clone(), body.mode.clone(), Box::new(runner));
    info!(bot = %body.id, strategy = %strategy_name, "bot created");

    (
        StatusCode::CREATED,
        Json(CreateBotResponse { id: body.id, strategy: strategy_name, mode: body.mode }),
    )
        .into_response()
}

fn seed_from_id(id: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    hasher.finish()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message.to_string() })).into_response()
}

fn not_found(id: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorResponse { error: format!("no bot named '{id}'") }))
        .into_response()
}

// ---------------------------------------------------------------------------
// POST /api/bots/{id}/start|stop|kill
// ---------------------------------------------------------------------------

pub(crate) async fn start_bot(State(st): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    if st.bots.status_one(&id).await.is_none() {
        return not_found(&id);
    }
    let started = st.bots.start(&id);
    let message = if started { "bot started" } else { "bot was already started" };
    info!(bot = %id, started, "start_bot");
    (StatusCode::OK, Json(MessageResponse { message: message.to_string() })).into_response()
}

pub(crate) async fn stop_bot(State(st): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    if st.bots.status_one(&id).await.is_none() {
        return not_found(&id);
    }
    st.bots.stop(&id, STOP_GRACE).await;
    info!(bot = %id, "stop_bot");
    (StatusCode::OK, Json(MessageResponse { message: "bot stopped".to_string() })).into_response()
}

pub(crate) async fn kill_bot(State(st): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    if st.bots.status_one(&id).await.is_none() {
        return not_found(&id);
    }
    st.bots.kill(&id);
    warn!(bot = %id, "kill_bot");
    (StatusCode::OK, Json(MessageResponse { message: "bot killed".to_string() })).into_response()
}

// ---------------------------------------------------------------------------
// GET /api/bots/{id}/status|trades|risk
// ---------------------------------------------------------------------------

pub(crate) async fn bot_status(State(st): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match st.bots.live_state(&id).await {
        Some(live) => (StatusCode::OK, Json(BotStatusResponse::from_live_state(&live))).into_response(),
        None => not_found(&id),
    }
}

pub(crate) async fn bot_trades(State(st): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match st.bots.live_state(&id).await {
        Some(live) => {
            let trades: TradesResponse = live.portfolio.trades.clone();
            (StatusCode::OK, Json(trades)).into_response()
        }
        None => not_found(&id),
    }
}

pub(crate) async fn bot_risk(State(st): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match st.bots.live_state(&id).await {
        Some(live) => (StatusCode::OK, Json(RiskResponse::from_live_state(&live))).into_response(),
        None => not_found(&id),
    }
}

// ---------------------------------------------------------------------------
// GET /api/metrics/global
// ---------------------------------------------------------------------------

pub(crate) async fn global_metrics(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshots = st.bots.status().await;
    let bots_running =
        snapshots.iter().filter(|s| s.state == mqk_runtime::BotState::Running).count();

    let mut total_equity = 0.0;
    let mut total_pnl = 0.0;
    let mut total_trades = 0usize;
    for snap in &snapshots {
        if let Some(live) = st.bots.live_state(&snap.id).await {
            let eq = equity(&live.portfolio);
            total_equity += eq.to_decimal();
            total_pnl += (eq - live.portfolio.initial_cash).to_decimal();
            total_trades += live.portfolio.trades.len();
        }
    }

    (
        StatusCode::OK,
        Json(GlobalMetricsResponse { bots_running, total_equity, total_pnl, total_trades }),
    )
}
