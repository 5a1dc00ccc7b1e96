//! Bot configuration records (§6): a merged layered-YAML document's
//! top-level `/bots` map, keyed by bot id, each entry carrying a
//! [`mqk_config::ConfigRecord`] (`strategy`/`parameters`/`metadata`) plus
//! the feed- and risk-shape fields the control-surface request body (§6)
//! doesn't need room for, since a config file can say much more than one
//! HTTP POST.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use mqk_config::ConfigRecord;
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Debug, Deserialize)]
pub struct RiskConfig {
    #[serde(default = "default_max_position_fraction")]
    pub max_position_fraction: f64,
    #[serde(default = "default_max_drawdown_pct")]
    pub max_drawdown_pct: f64,
    #[serde(default = "default_concentration_fraction")]
    pub concentration_fraction: f64,
    #[serde(default = "default_daily_loss_limit")]
    pub daily_loss_limit: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_fraction: default_max_position_fraction(),
            max_drawdown_pct: default_max_drawdown_pct(),
            concentration_fraction: default_concentration_fraction(),
            daily_loss_limit: default_daily_loss_limit(),
        }
    }
}

fn default_max_position_fraction() -> f64 {
    0.5
}
fn default_max_drawdown_pct() -> f64 {
    20.0
}
fn default_concentration_fraction() -> f64 {
    0.6
}
fn default_daily_loss_limit() -> f64 {
    0.1
}

#[derive(Clone, Debug, Deserialize)]
pub struct PaperConfig {
    #[serde(default = "default_starting_price")]
    pub starting_price: f64,
    #[serde(default = "default_interval")]
    pub interval: String,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self { starting_price: default_starting_price(), interval: default_interval() }
    }
}

fn default_starting_price() -> f64 {
    100.0
}
fn default_interval() -> String {
    "1m".to_string()
}

#[derive(Clone, Debug, Deserialize)]
pub struct HistoricalConfig {
    pub provider_base_url: String,
    pub start_ms: i64,
    pub end_ms: i64,
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

fn default_requests_per_minute() -> u32 {
    1200
}

#[derive(Clone, Debug, Deserialize)]
pub struct LiveConfig {
    pub ws_url: String,
    #[serde(default = "default_interval")]
    pub interval: String,
}

/// One `/bots/{id}` entry: the strategy/parameters/metadata record shared
/// with the rest of the ambient configuration stack, plus everything
/// needed to actually wire a runnable bot.
#[derive(Clone, Debug, Deserialize)]
pub struct BotConfig {
    #[serde(flatten)]
    pub record: ConfigRecord,
    pub symbol: String,
    pub mode: String,
    pub initial_balance: f64,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub paper: Option<PaperConfig>,
    #[serde(default)]
    pub historical: Option<HistoricalConfig>,
    #[serde(default)]
    pub live: Option<LiveConfig>,
}

/// Parse every entry under `/bots` in a merged config document, in bot-id
/// order so the same config always produces the same bot-startup order.
pub fn load_bot_configs(config_json: &Value) -> Result<Vec<(String, BotConfig)>> {
    let bots_val = config_json
        .pointer("/bots")
        .context("config has no top-level 'bots' map")?;
    let bots_obj = bots_val
        .as_object()
        .context("'bots' must be a map of bot id -> bot config")?;

    let sorted: BTreeMap<String, Value> =
        bots_obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

    let mut out = Vec::with_capacity(sorted.len());
    for (id, val) in sorted {
        let cfg: BotConfig = serde_json::from_value(val)
            .with_context(|| format!("bot '{id}' config does not match the expected shape"))?;
        out.push((id, cfg));
    }
    Ok(out)
}
