//! Strategy runner: the main loop that owns one strategy, one market feed,
//! and one execution engine (which in turn owns the portfolio and risk
//! engine), and drives them from feed events through to fills (§4.7).

mod bot;
mod live_state;
mod report;
mod runner;

pub use bot::RunnableBot;
pub use live_state::BotLiveState;
pub use report::{RunReport, RunnerSnapshot};
pub use runner::{RunnerError, StrategyRunner};
