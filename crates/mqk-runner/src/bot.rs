//! Object-safe view of a runner, so the bot manager (mqk-runtime) can hold a
//! heterogeneous set of `StrategyRunner<S>` instances behind one trait
//! object, keyed by strategy id, regardless of which concrete strategy or
//! feed mode each was built with (§4.8).

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use async_trait::async_trait;
use mqk_strategy::Strategy;
use tokio::sync::RwLock;

use crate::live_state::BotLiveState;
use crate::report::RunReport;
use crate::runner::{RunnerError, StrategyRunner};

#[async_trait]
pub trait RunnableBot: Send {
    fn strategy_name(&self) -> &str;

    /// The same handle `cancel_handle()` on the concrete runner would
    /// return; stored by the manager so it can cancel a bot without
    /// needing access to the boxed runner while it's running.
    fn cancel_handle(&self) -> Arc<AtomicBool>;

    /// The same handle `live_state_handle()` on the concrete runner would
    /// return; stored by the manager so a control surface can read it
    /// while the boxed runner is mid-loop on its own task (§6).
    fn live_state_handle(&self) -> Arc<RwLock<BotLiveState>>;

    async fn run(self: Box<Self>) -> Result<RunReport, RunnerError>;
}

#[async_trait]
impl<S: Strategy + 'static> RunnableBot for StrategyRunner<S> {
    fn strategy_name(&self) -> &str {
        StrategyRunner::strategy_name(self)
    }

    fn cancel_handle(&self) -> Arc<AtomicBool> {
        StrategyRunner::cancel_handle(self)
    }

    fn live_state_handle(&self) -> Arc<RwLock<BotLiveState>> {
        StrategyRunner::live_state_handle(self)
    }

    async fn run(mut self: Box<Self>) -> Result<RunReport, RunnerError> {
        StrategyRunner::run(&mut *self).await
    }
}
