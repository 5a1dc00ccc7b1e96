//! Library surface behind the `mqk` binary: loading bot configuration
//! records from layered YAML (§6, §10) and turning each one into a running
//! bot. Kept separate from `main.rs` so the process-lifecycle wiring
//! (signal handling, HTTP serving) stays thin and these pieces stay
//! testable without spawning a process.

pub mod config;
pub mod runtime;
