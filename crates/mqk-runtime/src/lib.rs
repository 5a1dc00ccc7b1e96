//! Bot manager: owns a set of strategy runners keyed by bot id, starts them
//! all concurrently, and answers `status()` with a consistent view even
//! while they're still running (§4.8).

mod manager;

pub use manager::{BotManager, BotSnapshot, BotState};
pub use mqk_runner::BotLiveState;
