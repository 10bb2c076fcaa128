//! # Dispatcher
//!
//! Alert fan-out module.
//!
//! Responsibilities:
//! - Consume `AlertEvent`
//! - Snapshot the registry and batch recipients per provider limits
//! - Send batches concurrently, each bounded by a timeout
//! - Map per-recipient receipts to `DeliveryAttempt`s
//! - Prune addresses the provider reports as invalid

pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod providers;

pub use contracts::{AlertEvent, DeliveryAttempt, DeliveryOutcome, PushProvider};
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::DispatcherError;
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use providers::{
    ConfiguredProvider, ExpoProvider, LogProvider, RecordingProvider, EXPO_MAX_BATCH_SIZE,
    EXPO_PUSH_ENDPOINT,
};
