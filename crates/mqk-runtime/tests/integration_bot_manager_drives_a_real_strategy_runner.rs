use std::time::Duration;

use mqk_execution::{ExecutionEngine, FillSimulator, SimulatorConfig};
use mqk_md::{PaperFeed, PaperFeedConfig};
use mqk_portfolio::{Ledger, Micros};
use mqk_risk::RiskEngine;
use mqk_runner::StrategyRunner;
use mqk_runtime::{BotManager, BotState};
use mqk_strategy::{SmaCrossoverStrategy, StrategyParams};

fn execution_engine() -> ExecutionEngine {
    let ledger = Ledger::new("sma_crossover", Micros::from_decimal(10_000.0));
    let risk = RiskEngine::with_canonical_rules(0.9, 0.9, 0.9, 0.9);
    let simulator = FillSimulator::new(SimulatorConfig::reference_defaults(), 11);
    ExecutionEngine::new(ledger, risk, simulator)
}

#[tokio::test]
async fn bot_manager_runs_a_paper_fed_sma_crossover_bot_to_completion() {
    let feed = PaperFeed::new(PaperFeedConfig::new("BTCUSDT", "1m", 100.0, 42));
    let runner = StrategyRunner::new(
        SmaCrossoverStrategy::new(),
        Box::new(feed),
        execution_engine(),
        StrategyParams::new(),
        "BTCUSDT",
    )
    .with_snapshot_cadence(5);
    let cancel = runner.cancel_handle();

    let manager = std::sync::Arc::new(BotManager::new());
    manager.add("sma-1", "paper", Box::new(runner));

    let run_handle = tokio::spawn({
        let manager = std::sync::Arc::clone(&manager);
        async move { manager.run_all().await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.store(true, std::sync::atomic::Ordering::SeqCst);
    run_handle.await.unwrap();

    let statuses = manager.status().await;
    assert_eq!(statuses.len(), 1);
    let bot = &statuses[0];
    assert_eq!(bot.id, "sma-1");
    assert!(matches!(bot.state, BotState::Stopped | BotState::Killed));
    let report = bot.report.as_ref().expect("completed bot carries a report");
    assert!(report.events_processed > 0);
}
