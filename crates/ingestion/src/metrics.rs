//! Broker client counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Publishes received on subscribed topics
    pub messages_received: AtomicU64,

    /// Publishes that failed to decode
    pub decode_errors: AtomicU64,

    /// Publishes on topics outside the subscription set
    pub ignored_messages: AtomicU64,

    /// Successful connects
    pub connects: AtomicU64,

    /// Failed connect attempts
    pub connect_failures: AtomicU64,

    /// Sessions that dropped after connecting
    pub disconnects: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.ignored_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connect_failure(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            ignored_messages: self.ignored_messages.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub decode_errors: u64,
    pub ignored_messages: u64,
    pub connects: u64,
    pub connect_failures: u64,
    pub disconnects: u64,
}
