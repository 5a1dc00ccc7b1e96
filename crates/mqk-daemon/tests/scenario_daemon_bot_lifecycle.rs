//! In-process scenario tests for mqk-daemon's bot-control surface (§6).
//!
//! These tests spin up the Axum router **without** binding a TCP socket.
//! Each test calls `routes::build_router` and drives it via
//! `tower::ServiceExt::oneshot` — no network I/O required.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use mqk_daemon::{routes, state};
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_router() -> (Arc<state::AppState>, axum::Router) {
    let st = Arc::new(state::AppState::new());
    let router = routes::build_router(Arc::clone(&st));
    (st, router)
}

async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp.into_body().collect().await.expect("body collect failed").to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder().method("GET").uri(uri).body(axum::body::Body::empty()).unwrap()
}

fn post_empty(uri: &str) -> Request<axum::body::Body> {
    Request::builder().method("POST").uri(uri).body(axum::body::Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

fn create_bot_body(id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "strategy": "sma_crossover",
        "symbol": "BTCUSDT",
        "mode": "paper",
        "initial_balance": 10_000.0,
        "parameters": { "fast_period": 2.0, "slow_period": 3.0, "order_qty": 1.0 },
    })
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let (_st, router) = make_router();
    let (status, body) = call(router, get("/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "mqk-daemon");
}

// ---------------------------------------------------------------------------
// GET /api/bots on an empty daemon
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_bots_is_empty_on_a_fresh_daemon() {
    let (_st, router) = make_router();
    let (status, body) = call(router, get("/api/bots")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body), serde_json::json!([]));
}

// ---------------------------------------------------------------------------
// POST /api/bots → appears in GET /api/bots as stopped
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_bot_then_appears_in_the_list_as_stopped() {
    let (st, _router) = make_router();

    let (status, body) = call(
        routes::build_router(Arc::clone(&st)),
        post_json("/api/bots", create_bot_body("bot-1")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created = parse_json(body);
    assert_eq!(created["id"], "bot-1");
    assert_eq!(created["strategy"], "sma_crossover");

    let (status, body) = call(routes::build_router(Arc::clone(&st)), get("/api/bots")).await;
    assert_eq!(status, StatusCode::OK);
    let list = parse_json(body);
    assert_eq!(list[0]["id"], "bot-1");
    assert_eq!(list[0]["mode"], "paper");
    assert_eq!(list[0]["status"], "stopped");
}

// ---------------------------------------------------------------------------
// GET /api/bots/{id}/status before the bot is started
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_of_a_freshly_created_bot_reflects_its_initial_balance() {
    let (st, _router) = make_router();
    call(routes::build_router(Arc::clone(&st)), post_json("/api/bots", create_bot_body("bot-1"))).await;

    let (status, body) =
        call(routes::build_router(Arc::clone(&st)), get("/api/bots/bot-1/status")).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert!((json["balance"].as_f64().unwrap() - 10_000.0).abs() < 1e-6);
    assert!((json["equity"].as_f64().unwrap() - 10_000.0).abs() < 1e-6);
    assert!((json["pnl"].as_f64().unwrap()).abs() < 1e-6);
    assert_eq!(json["positions"], serde_json::json!([]));
}

// ---------------------------------------------------------------------------
// Start → runs briefly → stop: status transitions and telemetry is live
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_runs_the_bot_and_stop_halts_it_within_the_grace_period() {
    let (st, _router) = make_router();
    call(routes::build_router(Arc::clone(&st)), post_json("/api/bots", create_bot_body("bot-1"))).await;

    let (status, body) = call(routes::build_router(Arc::clone(&st)), post_empty("/api/bots/bot-1/start")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["message"], "bot started");

    tokio::time::sleep(Duration::from_millis(100)).await;

    let (status, body) = call(routes::build_router(Arc::clone(&st)), get("/api/bots")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)[0]["status"], "running");

    let (status, body) = call(routes::build_router(Arc::clone(&st)), post_empty("/api/bots/bot-1/stop")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["message"], "bot stopped");

    let (_, body) = call(routes::build_router(Arc::clone(&st)), get("/api/bots")).await;
    let list = parse_json(body);
    assert!(matches!(list[0]["status"].as_str().unwrap(), "stopped" | "killed"));
}

// ---------------------------------------------------------------------------
// Kill returns immediately without waiting for the runner to exit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn kill_returns_immediately_and_the_bot_eventually_stops() {
    let (st, _router) = make_router();
    call(routes::build_router(Arc::clone(&st)), post_json("/api/bots", create_bot_body("bot-1"))).await;
    call(routes::build_router(Arc::clone(&st)), post_empty("/api/bots/bot-1/start")).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    let (status, body) = call(routes::build_router(Arc::clone(&st)), post_empty("/api/bots/bot-1/kill")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["message"], "bot killed");

    tokio::time::timeout(Duration::from_millis(500), async {
        loop {
            let (_, body) = call(routes::build_router(Arc::clone(&st)), get("/api/bots")).await;
            let list = parse_json(body);
            if matches!(list[0]["status"].as_str().unwrap(), "stopped" | "killed") {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("killed bot should stop promptly");
}

// ---------------------------------------------------------------------------
// Trades and risk views, and an unstarted bot's well-formed empty state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trades_and_risk_views_are_well_formed_before_any_fill() {
    let (st, _router) = make_router();
    call(routes::build_router(Arc::clone(&st)), post_json("/api/bots", create_bot_body("bot-1"))).await;

    let (status, body) = call(routes::build_router(Arc::clone(&st)), get("/api/bots/bot-1/trades")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body), serde_json::json!([]));

    let (status, body) = call(routes::build_router(Arc::clone(&st)), get("/api/bots/bot-1/risk")).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["evaluations"], serde_json::json!([]));
    assert_eq!(json["kill_switch_activated"], false);
}

// ---------------------------------------------------------------------------
// Global metrics aggregate across every registered bot
// ---------------------------------------------------------------------------

#[tokio::test]
async fn global_metrics_aggregates_every_registered_bot() {
    let (st, _router) = make_router();
    call(routes::build_router(Arc::clone(&st)), post_json("/api/bots", create_bot_body("bot-1"))).await;
    call(
        routes::build_router(Arc::clone(&st)),
        post_json("/api/bots", create_bot_body("bot-2")),
    )
    .await;

    let (status, body) = call(routes::build_router(Arc::clone(&st)), get("/api/metrics/global")).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["bots_running"], 0);
    assert!((json["total_equity"].as_f64().unwrap() - 20_000.0).abs() < 1e-6);
    assert!((json["total_pnl"].as_f64().unwrap()).abs() < 1e-6);
    assert_eq!(json["total_trades"], 0);

    call(routes::build_router(Arc::clone(&st)), post_empty("/api/bots/bot-1/start")).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    let (_, body) = call(routes::build_router(Arc::clone(&st)), get("/api/metrics/global")).await;
    assert_eq!(parse_json(body)["bots_running"], 1);
}

// ---------------------------------------------------------------------------
// Unknown bot ids return 404 across every per-bot route
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_bot_id_returns_404_on_every_per_bot_route() {
    let (st, _router) = make_router();

    for (method, uri) in [
        ("POST", "/api/bots/ghost/start"),
        ("POST", "/api/bots/ghost/stop"),
        ("POST", "/api/bots/ghost/kill"),
        ("GET", "/api/bots/ghost/status"),
        ("GET", "/api/bots/ghost/trades"),
        ("GET", "/api/bots/ghost/risk"),
    ] {
        let req = Request::builder().method(method).uri(uri).body(axum::body::Body::empty()).unwrap();
        let (status, body) = call(routes::build_router(Arc::clone(&st)), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri} should 404");
        assert!(parse_json(body)["error"].as_str().unwrap().contains("ghost"));
    }
}
