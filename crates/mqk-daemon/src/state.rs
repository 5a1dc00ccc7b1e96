//! Shared runtime state for mqk-daemon.
//!
//! `AppState` owns the bot manager (§4.8) and the strategy registry bots are
//! instantiated from (§4.1). Handlers receive `State<Arc<AppState>>` from
//! Axum; this module owns nothing async itself beyond what `BotManager`
//! already wraps in its own locks.

use std::path::PathBuf;

use mqk_audit::AuditWriter;
use mqk_runtime::BotManager;
use mqk_strategy::StrategyRegistry;
use uuid::Uuid;

/// Build metadata included in health responses, kept in the same shape the
/// control surface has always reported it in.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

pub struct AppState {
    pub build: BuildInfo,
    pub bots: BotManager,
    pub registry: StrategyRegistry,
    /// Directory hash-chained kill-switch audit entries (§7) are appended
    /// to, one file per bot id. `None` (the default unless
    /// `MQK_DAEMON_AUDIT_DIR` is set) disables audit wiring.
    pub audit_dir: Option<PathBuf>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            build: BuildInfo {
                service: "mqk-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            bots: BotManager::new(),
            registry: StrategyRegistry::with_reference_strategies(),
            audit_dir: std::env::var("MQK_DAEMON_AUDIT_DIR").ok().map(PathBuf::from),
        }
    }

    /// Builds an audit writer for `bot_id` if audit wiring is enabled, along
    /// with a deterministic run id derived from the bot id alone — no RNG,
    /// so the same bot id always ties back to the same audit run,
    /// mirroring `derive_daemon_run_id`'s v5 derivation in `routes.rs`.
    pub fn audit_writer_for(&self, bot_id: &str) -> Option<(AuditWriter, Uuid)> {
        let dir = self.audit_dir.as_ref()?;
        let path = dir.join(format!("{bot_id}.jsonl"));
        let writer = AuditWriter::new(path, true).ok()?;
        let run_id = derive_bot_run_id(bot_id);
        Some((writer, run_id))
    }
}

fn derive_bot_run_id(bot_id: &str) -> Uuid {
    let data = format!("mqk-daemon.bot.v1|{bot_id}");
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, data.as_bytes())
}
