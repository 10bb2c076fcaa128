//! Relay orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{RelayPipeline, RunningRelay};
pub use stats::RelayStats;
