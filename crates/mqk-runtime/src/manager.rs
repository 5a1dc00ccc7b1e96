use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mqk_runner::{BotLiveState, RunReport, RunnableBot};
use serde::Serialize;
use tokio::sync::RwLock as AsyncRwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// `stopped | running | killed | error`, per §6's `GET /api/bots`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BotState {
    Stopped,
    Running,
    Killed,
    Error,
}

#[derive(Clone, Debug, Serialize)]
pub struct BotSnapshot {
    pub id: String,
    pub strategy_name: String,
    pub mode: String,
    pub state: BotState,
    pub report: Option<RunReport>,
    pub error: Option<String>,
}

struct BotEntry {
    cancel: Arc<AtomicBool>,
    status: Arc<AsyncRwLock<BotSnapshot>>,
    live_state: Arc<AsyncRwLock<BotLiveState>>,
    pending: Mutex<Option<Box<dyn RunnableBot>>>,
}

/// Owns a set of runners keyed by bot id (§4.8). Each runner is driven on
/// its own tokio task; a panic or error in one never reaches the others —
/// it's captured and surfaced through [`BotManager::status`] instead.
#[derive(Default)]
pub struct BotManager {
    bots: Mutex<BTreeMap<String, Arc<BotEntry>>>,
}

impl BotManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a runner under `id` and `mode` (`historical | live | paper`,
    /// §4.6). Does not start it — call `run_all` or `start`.
    pub fn add(&self, id: impl Into<String>, mode: impl Into<String>, runner: Box<dyn RunnableBot>) {
        let id = id.into();
        let cancel = runner.cancel_handle();
        let live_state = runner.live_state_handle();
        let status = Arc::new(AsyncRwLock::new(BotSnapshot {
            id: id.clone(),
            strategy_name: runner.strategy_name().to_string(),
            mode: mode.into(),
            state: BotState::Stopped,
            report: None,
            error: None,
        }));
        let entry =
            Arc::new(BotEntry { cancel, status, live_state, pending: Mutex::new(Some(runner)) });
        self.bots.lock().unwrap().insert(id, entry);
    }

    /// Takes the pending runner out of `entry` (if any) and spawns it on its
    /// own task. Returns `None` if the bot was already started. The spawned
    /// task runs detached regardless of whether the returned handle is ever
    /// awaited — `run_all` awaits every handle to block until all bots
    /// finish, while `start` drops it to return immediately.
    fn spawn_entry(&self, entry: &Arc<BotEntry>) -> Option<JoinHandle<()>> {
        let runner = entry.pending.lock().unwrap().take()?;

        let status = Arc::clone(&entry.status);
        Some(tokio::spawn(async move {
            let id = {
                status.write().await.state = BotState::Running;
                status.read().await.id.clone()
            };
            info!(bot = %id, "bot started");

            let outcome = runner.run().await;
            let mut s = status.write().await;
            match outcome {
                Ok(report) => {
                    if report.halted {
                        warn!(bot = %s.id, reason = ?report.halt_reason, "bot halted by kill-switch");
                        s.state = BotState::Killed;
                    } else {
                        info!(bot = %s.id, events = report.events_processed, "bot finished");
                        s.state = BotState::Stopped;
                    }
                    s.report = Some(report);
                }
                Err(e) => {
                    error!(bot = %s.id, error = %e, "bot terminated with an error");
                    s.state = BotState::Error;
                    s.error = Some(e.to_string());
                }
            }
        }))
    }

    /// Starts every bot that isn't already running, concurrently, and waits
    /// for all of them to terminate (completion, cancellation, or
    /// kill-switch halt). A panicking or erroring bot is recorded in its
    /// own status and never stops the others.
    pub async fn run_all(&self) {
        let entries: Vec<Arc<BotEntry>> = self.bots.lock().unwrap().values().cloned().collect();
        let handles: Vec<JoinHandle<()>> =
            entries.iter().filter_map(|entry| self.spawn_entry(entry)).collect();

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "bot task panicked");
            }
        }
    }

    /// Starts one bot without waiting for it to finish (§6's
    /// `POST /api/bots/{id}/start`). Returns `false` if `id` is unknown or
    /// the bot was already started.
    pub fn start(&self, id: &str) -> bool {
        let Some(entry) = self.bots.lock().unwrap().get(id).cloned() else { return false };
        self.spawn_entry(&entry).is_some()
    }

    /// Cancels every bot, then waits up to `grace` for them to stop on
    /// their own. A bot that ignores cancellation past the grace period is
    /// abandoned — `stop_all` returns regardless of whether its task is
    /// still resident.
    pub async fn stop_all(&self, grace: Duration) {
        let entries: Vec<Arc<BotEntry>> = self.bots.lock().unwrap().values().cloned().collect();
        for entry in &entries {
            entry.cancel.store(true, Ordering::SeqCst);
        }

        let deadline = tokio::time::Instant::now() + grace;
        for entry in &entries {
            if entry.status.read().await.state != BotState::Running {
                continue;
            }
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if tokio::time::timeout(remaining, wait_until_stopped(&entry.status)).await.is_err() {
                warn!("bot did not stop within the grace period; abandoning");
            }
        }
    }

    /// Cancels one bot and waits up to `grace` for it to stop on its own
    /// (§6's `POST /api/bots/{id}/stop`). Returns `false` if `id` is
    /// unknown.
    pub async fn stop(&self, id: &str, grace: Duration) -> bool {
        let Some(entry) = self.bots.lock().unwrap().get(id).cloned() else { return false };
        entry.cancel.store(true, Ordering::SeqCst);
        if entry.status.read().await.state == BotState::Running
            && tokio::time::timeout(grace, wait_until_stopped(&entry.status)).await.is_err()
        {
            warn!(bot = %id, "bot did not stop within the grace period; abandoning");
        }
        true
    }

    /// Cancels one bot and returns immediately, without waiting for it to
    /// actually terminate (§6's `POST /api/bots/{id}/kill`) — a deliberately
    /// more abrupt counterpart to `stop`. Returns `false` if `id` is
    /// unknown.
    pub fn kill(&self, id: &str) -> bool {
        let Some(entry) = self.bots.lock().unwrap().get(id).cloned() else { return false };
        entry.cancel.store(true, Ordering::SeqCst);
        true
    }

    pub async fn status(&self) -> Vec<BotSnapshot> {
        let entries: Vec<Arc<BotEntry>> = self.bots.lock().unwrap().values().cloned().collect();
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            out.push(entry.status.read().await.clone());
        }
        out
    }

    pub async fn status_one(&self, id: &str) -> Option<BotSnapshot> {
        let entry = self.bots.lock().unwrap().get(id).cloned()?;
        Some(entry.status.read().await.clone())
    }

    /// The live, mid-run portfolio/risk/kill-switch telemetry a runner
    /// publishes at every market event (§6's `/status`, `/trades`, `/risk`),
    /// distinct from `status`'s final `RunReport` which is only populated
    /// once the bot finishes.
    pub async fn live_state(&self, id: &str) -> Option<BotLiveState> {
        let entry = self.bots.lock().unwrap().get(id).cloned()?;
        Some(entry.live_state.read().await.clone())
    }

    /// Whether a bot is registered under `id` (§6's `POST /api/bots`
    /// duplicate-id check).
    pub fn contains(&self, id: &str) -> bool {
        self.bots.lock().unwrap().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.bots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn wait_until_stopped(status: &AsyncRwLock<BotSnapshot>) {
    loop {
        if status.read().await.state != BotState::Running {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[cfg(test)]
mod tests {
    use mqk_portfolio::{Micros, PortfolioState};
    use mqk_runner::RunnerError;

    use super::*;

    struct FakeBot {
        name: &'static str,
        cancel: Arc<AtomicBool>,
        wait_for_cancel: bool,
        fails: bool,
    }

    fn fake_report(halted: bool) -> RunReport {
        RunReport {
            events_processed: 1,
            snapshots: Vec::new(),
            final_portfolio: PortfolioState::new("s".to_string(), Micros::from_decimal(10_000.0)),
            halted,
            halt_reason: None,
        }
    }

    #[async_trait::async_trait]
    impl RunnableBot for FakeBot {
        fn strategy_name(&self) -> &str {
            self.name
        }

        fn cancel_handle(&self) -> Arc<AtomicBool> {
            Arc::clone(&self.cancel)
        }

        fn live_state_handle(&self) -> Arc<AsyncRwLock<BotLiveState>> {
            Arc::new(AsyncRwLock::new(BotLiveState::new(PortfolioState::new(
                "s".to_string(),
                Micros::from_decimal(10_000.0),
            ))))
        }

        async fn run(self: Box<Self>) -> Result<RunReport, RunnerError> {
            if self.fails {
                return Err(RunnerError::Feed(mqk_md::FeedError::Closed));
            }
            if self.wait_for_cancel {
                while !self.cancel.load(Ordering::SeqCst) {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                return Ok(fake_report(true));
            }
            Ok(fake_report(false))
        }
    }

    #[tokio::test]
    async fn run_all_waits_for_every_bot_and_records_its_outcome() {
        let manager = BotManager::new();
        manager.add(
            "a",
            "paper",
            Box::new(FakeBot { name: "buy_once", cancel: Arc::new(AtomicBool::new(false)), wait_for_cancel: false, fails: false }),
        );
        manager.add(
            "b",
            "paper",
            Box::new(FakeBot { name: "mean_reversion", cancel: Arc::new(AtomicBool::new(false)), wait_for_cancel: false, fails: true }),
        );

        manager.run_all().await;

        let statuses = manager.status().await;
        assert_eq!(statuses.len(), 2);
        let a = statuses.iter().find(|s| s.id == "a").unwrap();
        assert_eq!(a.state, BotState::Stopped);
        let b = statuses.iter().find(|s| s.id == "b").unwrap();
        assert_eq!(b.state, BotState::Error);
        assert!(b.error.is_some());
    }

    #[tokio::test]
    async fn stop_all_cancels_running_bots_within_the_grace_period() {
        let manager = Arc::new(BotManager::new());
        manager.add(
            "a",
            "paper",
            Box::new(FakeBot { name: "buy_once", cancel: Arc::new(AtomicBool::new(false)), wait_for_cancel: true, fails: false }),
        );

        let run_handle = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.run_all().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(manager.status().await[0].state, BotState::Running);

        manager.stop_all(Duration::from_millis(500)).await;
        run_handle.await.unwrap();

        let statuses = manager.status().await;
        assert_eq!(statuses[0].state, BotState::Killed);
    }

    #[tokio::test]
    async fn stop_all_returns_promptly_when_nothing_is_running() {
        let manager = BotManager::new();
        manager.add(
            "a",
            "paper",
            Box::new(FakeBot { name: "buy_once", cancel: Arc::new(AtomicBool::new(false)), wait_for_cancel: false, fails: false }),
        );
        manager.stop_all(Duration::from_millis(50)).await;
        let statuses = manager.status().await;
        assert_eq!(statuses[0].state, BotState::Stopped);
    }

    #[tokio::test]
    async fn start_is_non_blocking_and_reports_unknown_ids() {
        let manager = BotManager::new();
        manager.add(
            "a",
            "paper",
            Box::new(FakeBot { name: "buy_once", cancel: Arc::new(AtomicBool::new(false)), wait_for_cancel: true, fails: false }),
        );

        assert!(!manager.start("missing"));
        assert!(manager.start("a"));
        // a second start on the same id finds no pending runner left.
        assert!(!manager.start("a"));

        let snapshot = manager.status_one("a").await.unwrap();
        assert_eq!(snapshot.mode, "paper");

        manager.kill("a");
        tokio::time::timeout(Duration::from_millis(500), async {
            loop {
                if manager.status_one("a").await.unwrap().state != BotState::Running {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("killed bot should stop promptly");
    }

    #[tokio::test]
    async fn stop_waits_for_one_bot_and_kill_returns_immediately() {
        let manager = BotManager::new();
        manager.add(
            "a",
            "paper",
            Box::new(FakeBot { name: "buy_once", cancel: Arc::new(AtomicBool::new(false)), wait_for_cancel: true, fails: false }),
        );
        assert!(manager.start("a"));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(manager.stop("a", Duration::from_millis(500)).await);
        assert_eq!(manager.status_one("a").await.unwrap().state, BotState::Killed);

        assert!(!manager.kill("missing"));
    }

    #[tokio::test]
    async fn live_state_is_readable_while_a_bot_is_unknown_or_registered() {
        let manager = BotManager::new();
        assert!(manager.live_state("missing").await.is_none());

        manager.add(
            "a",
            "paper",
            Box::new(FakeBot { name: "buy_once", cancel: Arc::new(AtomicBool::new(false)), wait_for_cancel: false, fails: false }),
        );
        let live = manager.live_state("a").await.expect("registered bot has live state");
        assert!(!live.kill_switch_activated);
    }
}
