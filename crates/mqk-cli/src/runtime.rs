//! Turning one [`BotConfig`] into a runnable bot (§4.6, §4.7, §4.8): pick a
//! feed implementation for the configured mode, build the ledger/risk/
//! simulator stack the execution engine needs, instantiate the strategy
//! from the registry, and wire an optional hash-chained audit log.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use mqk_audit::AuditWriter;
use mqk_execution::{ExecutionEngine, FillSimulator, SimulatorConfig};
use mqk_md::{
    HistoricalCache, HistoricalFeed, LiveFeed, LiveFeedConfig, MarketFeed, PaperFeed,
    PaperFeedConfig, RestKlinesProvider, TokenBucket,
};
use mqk_portfolio::{Ledger, Micros};
use mqk_risk::RiskEngine;
use mqk_runner::{RunnableBot, StrategyRunner};
use mqk_strategy::{Strategy, StrategyRegistry};
use uuid::Uuid;

use crate::config::BotConfig;

/// Builds one bot's complete execution stack and wraps it as a
/// [`RunnableBot`] the bot manager can schedule, without starting it.
pub fn build_runner(
    id: &str,
    cfg: &BotConfig,
    registry: &StrategyRegistry,
    audit_dir: Option<&Path>,
) -> Result<Box<dyn RunnableBot>> {
    let strategy = registry
        .instantiate(&cfg.record.strategy.name)
        .with_context(|| format!("bot '{id}': unknown strategy '{}'", cfg.record.strategy.name))?;
    strategy
        .validate_parameters(&cfg.record.parameters)
        .map_err(|e| anyhow::anyhow!("bot '{id}': invalid strategy parameters: {e}"))?;

    let ledger = Ledger::new(id.to_string(), Micros::from_decimal(cfg.initial_balance));
    let risk = RiskEngine::with_canonical_rules(
        cfg.risk.max_position_fraction,
        cfg.risk.max_drawdown_pct,
        cfg.risk.concentration_fraction,
        cfg.risk.daily_loss_limit,
    );
    let seed = cfg.seed.unwrap_or_else(|| seed_from_id(id));
    let simulator = FillSimulator::new(SimulatorConfig::reference_defaults(), seed);
    let execution = ExecutionEngine::new(ledger, risk, simulator);

    let feed = build_feed(id, cfg, seed)?;

    let mut runner = StrategyRunner::new(
        strategy,
        feed,
        execution,
        cfg.record.parameters.clone(),
        cfg.symbol.clone(),
    );

    if let Some(dir) = audit_dir {
        let path = dir.join(format!("{id}.jsonl"));
        match AuditWriter::new(path, true) {
            Ok(writer) => runner = runner.with_audit(writer, derive_bot_run_id(id)),
            Err(e) => tracing::warn!(bot = %id, error = %e, "could not open audit log, continuing without one"),
        }
    }

    Ok(Box::new(runner))
}

fn build_feed(id: &str, cfg: &BotConfig, seed: u64) -> Result<Box<dyn MarketFeed>> {
    match cfg.mode.as_str() {
        "paper" => {
            let paper = cfg.paper.clone().unwrap_or_default();
            Ok(Box::new(PaperFeed::new(PaperFeedConfig::new(
                cfg.symbol.clone(),
                paper.interval,
                paper.starting_price,
                seed,
            ))))
        }
        "historical" => {
            let h = cfg
                .historical
                .as_ref()
                .with_context(|| format!("bot '{id}': mode 'historical' requires a 'historical' block"))?;
            let provider = Arc::new(RestKlinesProvider::new(h.provider_base_url.clone()));
            let cache = Arc::new(HistoricalCache::new());
            let rate_limiter = Arc::new(TokenBucket::per_minute(h.requests_per_minute));
            Ok(Box::new(HistoricalFeed::new(
                provider,
                cache,
                rate_limiter,
                cfg.symbol.clone(),
                h.interval.clone(),
                h.start_ms,
                h.end_ms,
            )))
        }
        "live" => {
            let l = cfg
                .live
                .as_ref()
                .with_context(|| format!("bot '{id}': mode 'live' requires a 'live' block"))?;
            Ok(Box::new(LiveFeed::new(LiveFeedConfig::new(
                l.ws_url.clone(),
                vec![cfg.symbol.clone()],
                l.interval.clone(),
            ))))
        }
        other => anyhow::bail!("bot '{id}': unknown mode '{other}' (expected paper, historical, or live)"),
    }
}

fn seed_from_id(id: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    hasher.finish()
}

fn derive_bot_run_id(bot_id: &str) -> Uuid {
    let data = format!("mqk-cli.bot.v1|{bot_id}");
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, data.as_bytes())
}
