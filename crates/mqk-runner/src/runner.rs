//! The main loop (§4.7): connect the feed, start the execution engine, then
//! for every event update the trailing window, ask the strategy for
//! signals, submit them, feed the event to the execution engine's pending-
//! order processing, and sample a portfolio snapshot at a cadence. Exits on
//! feed exhaustion, cancellation, or a kill-switch halt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mqk_audit::AuditWriter;
use mqk_execution::ExecutionEngine;
use mqk_md::{FeedError, MarketFeed};
use mqk_schemas::{MarketSnapshot, OrderStatus};
use mqk_strategy::{Strategy, StrategyParams};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::live_state::BotLiveState;
use crate::report::{RunReport, RunnerSnapshot};

/// Reference cadence from §4.7: "~100 snapshots per run". Exposed as a
/// per-event-count default rather than derived from an unknown total run
/// length, since live/paper feeds have no fixed horizon.
const DEFAULT_SNAPSHOT_CADENCE: usize = 50;

#[derive(Debug)]
pub enum RunnerError {
    Feed(FeedError),
}

impl std::fmt::Display for RunnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Feed(e) => write!(f, "runner feed error: {e}"),
        }
    }
}

impl std::error::Error for RunnerError {}

impl From<FeedError> for RunnerError {
    fn from(e: FeedError) -> Self {
        Self::Feed(e)
    }
}

/// Owns one strategy, one feed, and one execution engine (and, through it,
/// one portfolio and one risk engine). Not `Clone` — a runner is a single
/// in-progress session.
pub struct StrategyRunner<S: Strategy> {
    strategy: S,
    feed: Box<dyn MarketFeed>,
    execution: ExecutionEngine,
    params: StrategyParams,
    symbol: String,
    snapshot_cadence: usize,
    cancel: Arc<AtomicBool>,
    audit: Option<(AuditWriter, Uuid)>,
    live: Arc<RwLock<BotLiveState>>,
}

impl<S: Strategy> StrategyRunner<S> {
    pub fn new(
        strategy: S,
        feed: Box<dyn MarketFeed>,
        execution: ExecutionEngine,
        params: StrategyParams,
        symbol: impl Into<String>,
    ) -> Self {
        let live = Arc::new(RwLock::new(BotLiveState::new(execution.portfolio().snapshot())));
        Self {
            strategy,
            feed,
            execution,
            params,
            symbol: symbol.into(),
            snapshot_cadence: DEFAULT_SNAPSHOT_CADENCE,
            cancel: Arc::new(AtomicBool::new(false)),
            audit: None,
            live,
        }
    }

    pub fn with_snapshot_cadence(mut self, events_per_snapshot: usize) -> Self {
        self.snapshot_cadence = events_per_snapshot.max(1);
        self
    }

    /// Appends a kill-switch audit entry (§7) to `writer` under `run_id`
    /// whenever this runner's execution engine trips its kill-switch.
    pub fn with_audit(mut self, writer: AuditWriter, run_id: Uuid) -> Self {
        self.audit = Some((writer, run_id));
        self
    }

    /// A cloneable handle. Setting it to `true` stops the loop before its
    /// next event is processed — used by the bot manager's `stop_all`.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// A cheap handle a control surface can poll concurrently for
    /// `/status`, `/trades`, `/risk` (§6) while this runner is mid-loop.
    pub fn live_state_handle(&self) -> Arc<RwLock<BotLiveState>> {
        Arc::clone(&self.live)
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    pub fn execution(&self) -> &ExecutionEngine {
        &self.execution
    }

    pub async fn run(&mut self) -> Result<RunReport, RunnerError> {
        self.feed.connect().await?;
        info!(strategy = self.strategy.name(), symbol = %self.symbol, "strategy runner starting");

        let lookback = self.strategy.lookback().max(1);
        let mut window: Vec<MarketSnapshot> = Vec::with_capacity(lookback);
        let mut snapshots = Vec::new();
        let mut events_processed = 0usize;
        let mut halt_reason = None;
        let mut last_timestamp_ms = 0i64;

        loop {
            if self.cancel.load(Ordering::SeqCst) {
                halt_reason = Some("cancelled".to_string());
                break;
            }

            let event = match self.feed.next_snapshot().await {
                Ok(Some(e)) => e,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "feed error, stopping runner");
                    halt_reason = Some(e.to_string());
                    break;
                }
            };
            last_timestamp_ms = event.timestamp_ms();

            window.push(event.clone());
            if window.len() > lookback {
                window.remove(0);
            }
            events_processed += 1;

            if window.len() >= lookback {
                if self.evaluate_strategy(&window) {
                    warn!(events_processed, "critical pre-trade risk violation, stopping runner");
                    halt_reason = Some("critical pre-trade risk violation".to_string());
                    snapshots.push(self.snapshot(events_processed, last_timestamp_ms, false));
                    break;
                }
            }

            self.execution.on_market_event(&event);

            if let Some(ks_event) = self.execution.take_kill_switch_event() {
                self.record_kill_switch(&ks_event);
            }

            self.sync_live_state().await;

            if self.execution.is_halted() {
                warn!(events_processed, "execution engine halted by kill-switch, stopping runner");
                halt_reason = Some("kill-switch engaged by post-trade risk violation".to_string());
                snapshots.push(self.snapshot(events_processed, last_timestamp_ms, true));
                break;
            }

            if events_processed % self.snapshot_cadence == 0 {
                debug!(events_processed, "portfolio snapshot recorded");
                snapshots.push(self.snapshot(events_processed, last_timestamp_ms, false));
            }
        }

        self.feed.disconnect().await;
        self.sync_live_state().await;

        let halted = self.execution.is_halted();
        let final_portfolio = self.execution.portfolio().snapshot();
        snapshots.push(RunnerSnapshot {
            event_index: events_processed,
            timestamp_ms: last_timestamp_ms,
            portfolio: final_portfolio.clone(),
            halted,
        });

        info!(events_processed, halted, "strategy runner stopped");

        Ok(RunReport { events_processed, snapshots, final_portfolio, halted, halt_reason })
    }

    /// Submits every signal the strategy generates for this window.
    /// Returns `true` if a submission was rejected for a critical
    /// (drawdown-style) pre-trade risk violation, in which case the
    /// remaining signals are skipped and [`StrategyRunner::run`] stops
    /// the loop entirely (§4.7).
    fn evaluate_strategy(&mut self, window: &[MarketSnapshot]) -> bool {
        let position = self.execution.portfolio().snapshot().position(&self.symbol).cloned();
        let signals = self.strategy.generate_signals(window, position.as_ref(), &self.params);
        for signal in signals {
            let (order, critical) = self.execution.submit(signal);
            if order.status == OrderStatus::Rejected {
                warn!(reason = ?order.rejection_reason, symbol = %order.signal.symbol, "signal rejected");
            }
            if critical {
                return true;
            }
        }
        false
    }

    /// Appends the kill-switch audit entry `{strategy_id, timestamp,
    /// violations, positions_flattened}` (§7) if an audit writer was
    /// configured via [`StrategyRunner::with_audit`].
    fn record_kill_switch(&mut self, event: &mqk_execution::KillSwitchEvent) {
        let Some((writer, run_id)) = self.audit.as_mut() else { return };
        let payload = serde_json::json!({
            "strategy_id": self.strategy.name(),
            "timestamp": event.timestamp_ms,
            "violations": event.violations,
            "positions_flattened": event.positions_flattened,
        });
        if let Err(e) = writer.append(*run_id, "RISK", "KILL_SWITCH", payload) {
            error!(error = %e, "failed to append kill-switch audit entry");
        }
    }

    /// Publishes the current portfolio, the most recent post-trade risk
    /// evaluations, and the kill-switch flag to [`StrategyRunner::live_state_handle`]
    /// readers.
    async fn sync_live_state(&self) {
        let mut guard = self.live.write().await;
        guard.portfolio = self.execution.portfolio().snapshot();
        guard.risk_evaluations = self.execution.last_post_trade_violations().to_vec();
        guard.kill_switch_activated = self.execution.is_halted();
    }

    fn snapshot(&self, event_index: usize, timestamp_ms: i64, halted: bool) -> RunnerSnapshot {
        RunnerSnapshot { event_index, timestamp_ms, portfolio: self.execution.portfolio().snapshot(), halted }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use mqk_execution::{ExecutionEngine, FillSimulator, SimulatorConfig};
    use mqk_md::ConnectionEvent;
    use mqk_portfolio::Ledger;
    use mqk_risk::RiskEngine;
    use mqk_schemas::{Candle, Micros, Position, Side, Signal};
    use mqk_strategy::{ParameterSpec, StrategyError};
    use tokio::sync::mpsc;

    use super::*;

    struct FixedBarFeed {
        bars: VecDeque<MarketSnapshot>,
    }

    impl FixedBarFeed {
        fn new(closes: &[f64]) -> Self {
            let bars = closes
                .iter()
                .enumerate()
                .map(|(i, &close)| {
                    let candle = Candle {
                        timestamp_ms: i as i64 * 60_000,
                        symbol: "BTCUSDT".to_string(),
                        interval: "1m".to_string(),
                        open: Micros::from_decimal(close),
                        high: Micros::from_decimal(close * 1.001),
                        low: Micros::from_decimal(close * 0.999),
                        close: Micros::from_decimal(close),
                        volume: Micros::from_decimal(10.0),
                        quote_volume: None,
                        trade_count: None,
                        taker_buy_volume: None,
                        taker_buy_quote_volume: None,
                    };
                    MarketSnapshot::from_candle(candle)
                })
                .collect();
            Self { bars }
        }
    }

    #[async_trait]
    impl MarketFeed for FixedBarFeed {
        async fn connect(&mut self) -> Result<(), FeedError> {
            Ok(())
        }

        async fn next_snapshot(&mut self) -> Result<Option<MarketSnapshot>, FeedError> {
            Ok(self.bars.pop_front())
        }

        async fn disconnect(&mut self) {}

        fn take_lifecycle_events(&mut self) -> Option<mpsc::Receiver<ConnectionEvent>> {
            None
        }
    }

    /// Buys one unit on the first bar it ever sees and never trades again.
    struct BuyOnceStrategy {
        fired: std::cell::Cell<bool>,
    }

    impl BuyOnceStrategy {
        fn new() -> Self {
            Self { fired: std::cell::Cell::new(false) }
        }
    }

    impl Strategy for BuyOnceStrategy {
        fn name(&self) -> &str {
            "buy_once"
        }

        fn lookback(&self) -> usize {
            1
        }

        fn generate_signals(
            &self,
            market_window: &[MarketSnapshot],
            _current_position: Option<&Position>,
            _params: &StrategyParams,
        ) -> Vec<Signal> {
            if self.fired.get() {
                return Vec::new();
            }
            self.fired.set(true);
            let last = market_window.last().unwrap();
            vec![Signal {
                symbol: last.symbol().to_string(),
                side: Side::Buy,
                quantity: Micros::from_decimal(1.0),
                timestamp_ms: last.timestamp_ms(),
                strategy_id: "buy_once".to_string(),
                order_type: mqk_schemas::OrderType::Market,
                limit_price: None,
                stop_price: None,
                time_in_force: mqk_schemas::TimeInForce::Gtc,
                metadata: Default::default(),
            }]
        }

        fn validate_parameters(&self, _params: &StrategyParams) -> Result<(), StrategyError> {
            Ok(())
        }

        fn update_parameters(&mut self, _params: StrategyParams) -> Result<(), StrategyError> {
            Ok(())
        }

        fn required_indicators(&self) -> Vec<String> {
            Vec::new()
        }

        fn parameter_schema(&self) -> Vec<ParameterSpec> {
            Vec::new()
        }
    }

    /// Buys one more unit on every bar, regardless of position.
    struct AlwaysBuyStrategy;

    impl Strategy for AlwaysBuyStrategy {
        fn name(&self) -> &str {
            "always_buy"
        }

        fn lookback(&self) -> usize {
            1
        }

        fn generate_signals(
            &self,
            market_window: &[MarketSnapshot],
            _current_position: Option<&Position>,
            _params: &StrategyParams,
        ) -> Vec<Signal> {
            let last = market_window.last().unwrap();
            vec![Signal {
                symbol: last.symbol().to_string(),
                side: Side::Buy,
                quantity: Micros::from_decimal(1.0),
                timestamp_ms: last.timestamp_ms(),
                strategy_id: "always_buy".to_string(),
                order_type: mqk_schemas::OrderType::Market,
                limit_price: None,
                stop_price: None,
                time_in_force: mqk_schemas::TimeInForce::Gtc,
                metadata: Default::default(),
            }]
        }

        fn validate_parameters(&self, _params: &StrategyParams) -> Result<(), StrategyError> {
            Ok(())
        }

        fn update_parameters(&mut self, _params: StrategyParams) -> Result<(), StrategyError> {
            Ok(())
        }

        fn required_indicators(&self) -> Vec<String> {
            Vec::new()
        }

        fn parameter_schema(&self) -> Vec<ParameterSpec> {
            Vec::new()
        }
    }

    fn execution_engine() -> ExecutionEngine {
        let ledger = Ledger::new("buy_once", Micros::from_decimal(10_000.0));
        let risk = RiskEngine::with_canonical_rules(0.5, 0.5, 0.5, 0.5);
        let simulator = FillSimulator::new(SimulatorConfig::reference_defaults(), 7);
        ExecutionEngine::new(ledger, risk, simulator)
    }

    #[tokio::test]
    async fn runs_to_completion_and_records_a_final_snapshot() {
        let feed = FixedBarFeed::new(&[100.0, 101.0, 102.0, 103.0, 104.0]);
        let mut runner = StrategyRunner::new(
            BuyOnceStrategy::new(),
            Box::new(feed),
            execution_engine(),
            StrategyParams::new(),
            "BTCUSDT",
        )
        .with_snapshot_cadence(2);

        let report = runner.run().await.unwrap();

        assert_eq!(report.events_processed, 5);
        assert!(!report.halted);
        assert!(report.halt_reason.is_none());
        assert!(report.snapshots.last().unwrap().event_index == 5);
        assert!(!report.final_portfolio.position("BTCUSDT").unwrap().is_flat());
    }

    #[tokio::test]
    async fn kill_switch_trip_appends_an_audit_entry() {
        let feed = FixedBarFeed::new(&[100.0, 101.0, 102.0, 103.0, 104.0]);
        let ledger = Ledger::new("buy_once", Micros::from_decimal(10_000.0));
        // threshold so tight that the fee-driven drawdown from the very
        // first fill trips the kill-switch on the next market event.
        let risk = RiskEngine::with_canonical_rules(0.9, 0.00001, 0.9, 0.9);
        let simulator = FillSimulator::new(SimulatorConfig::reference_defaults(), 7);
        let execution = ExecutionEngine::new(ledger, risk, simulator);

        let audit_path = std::env::temp_dir().join(format!(
            "mqk_runner_test_kill_switch_{}_{}",
            std::process::id(),
            uuid::Uuid::new_v4().as_simple()
        ));
        let writer = AuditWriter::new(&audit_path, true).unwrap();
        let run_id = uuid::Uuid::new_v4();

        let mut runner = StrategyRunner::new(
            BuyOnceStrategy::new(),
            Box::new(feed),
            execution,
            StrategyParams::new(),
            "BTCUSDT",
        )
        .with_audit(writer, run_id);

        let report = runner.run().await.unwrap();
        assert!(report.halted);

        let logged = std::fs::read_to_string(&audit_path).unwrap();
        assert!(logged.contains("KILL_SWITCH"));
        assert!(logged.contains("BTCUSDT"));
        let _ = std::fs::remove_file(&audit_path);
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop_before_the_next_event() {
        let feed = FixedBarFeed::new(&[100.0, 101.0, 102.0]);
        let mut runner = StrategyRunner::new(
            BuyOnceStrategy::new(),
            Box::new(feed),
            execution_engine(),
            StrategyParams::new(),
            "BTCUSDT",
        );
        let cancel = runner.cancel_handle();
        cancel.store(true, Ordering::SeqCst);

        let report = runner.run().await.unwrap();

        assert_eq!(report.events_processed, 0);
        assert_eq!(report.halt_reason.as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn critical_pre_trade_violation_stops_the_runner_before_feed_exhaustion() {
        let feed = FixedBarFeed::new(&[100.0, 100.0, 40.0, 40.0, 40.0]);
        let ledger = Ledger::new("always_buy", Micros::from_decimal(10_000.0));
        // Drawdown threshold tight enough that the mark-to-market loss from
        // the price drop to 40 trips `max_drawdown` (critical) on the next
        // signal's pre-trade check.
        let risk = RiskEngine::with_canonical_rules(1.0, 1.0, 1.0, 1_000_000.0);
        let simulator = FillSimulator::new(SimulatorConfig::reference_defaults(), 7);
        let execution = ExecutionEngine::new(ledger, risk, simulator);

        let mut runner = StrategyRunner::new(
            AlwaysBuyStrategy,
            Box::new(feed),
            execution,
            StrategyParams::new(),
            "BTCUSDT",
        );

        let report = runner.run().await.unwrap();

        assert!(report.events_processed < 5, "runner should stop before the feed was exhausted");
        assert_eq!(report.halt_reason.as_deref(), Some("critical pre-trade risk violation"));
    }
}
