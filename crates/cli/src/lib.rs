//! # push-relay
//!
//! Relay wiring shared by the `push-relay` binary and the e2e tests.
//!
//! ```text
//! broker ─► BrokerClient ─mpsc─► rule stage ─mpsc─► Dispatcher ─► PushProvider
//!                 │                                      ▲
//!                 └─ watch<BrokerState> ─► Ingress ─► Registry
//! ```

pub mod error;
pub mod pipeline;

pub use error::CliError;
pub use pipeline::{RelayPipeline, RelayStats, RunningRelay};
