//! Execution pipeline: the fill simulator that turns a pending order into
//! fills against a market snapshot, and the execution engine that owns
//! order lifecycle, wires the risk engine's pre/post-trade checks, and
//! drives the kill-switch's `flatten_all` response.

mod engine;
mod order_id;
mod simulator;
mod simulator_config;

pub use engine::{ExecutionEngine, KillSwitchEvent};
pub use order_id::OrderIdGenerator;
pub use simulator::FillSimulator;
pub use simulator_config::SimulatorConfig;
