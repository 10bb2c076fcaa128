//! Dispatch metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one dispatcher
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Alerts dispatched
    alerts: AtomicU64,
    /// Provider calls started
    batches: AtomicU64,
    /// Provider calls that failed as a whole
    batch_failures: AtomicU64,
    /// Provider calls that hit the batch timeout
    batch_timeouts: AtomicU64,
    /// Successful per-recipient deliveries
    delivered: AtomicU64,
    /// Failed per-recipient deliveries
    failed: AtomicU64,
    /// Deliveries rejected as invalid address
    invalid_addresses: AtomicU64,
    /// Registry entries pruned
    pruned: AtomicU64,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> u64 {
        self.alerts.load(Ordering::Relaxed)
    }

    pub fn inc_alerts(&self) {
        self.alerts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    pub fn inc_batches(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batch_failures(&self) -> u64 {
        self.batch_failures.load(Ordering::Relaxed)
    }

    pub fn inc_batch_failures(&self) {
        self.batch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batch_timeouts(&self) -> u64 {
        self.batch_timeouts.load(Ordering::Relaxed)
    }

    pub fn inc_batch_timeouts(&self) {
        self.batch_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn inc_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn invalid_addresses(&self) -> u64 {
        self.invalid_addresses.load(Ordering::Relaxed)
    }

    pub fn inc_invalid_addresses(&self) {
        self.invalid_addresses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pruned(&self) -> u64 {
        self.pruned.load(Ordering::Relaxed)
    }

    pub fn inc_pruned(&self) {
        self.pruned.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            alerts: self.alerts(),
            batches: self.batches(),
            batch_failures: self.batch_failures(),
            batch_timeouts: self.batch_timeouts(),
            delivered: self.delivered(),
            failed: self.failed(),
            invalid_addresses: self.invalid_addresses(),
            pruned: self.pruned(),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub alerts: u64,
    pub batches: u64,
    pub batch_failures: u64,
    pub batch_timeouts: u64,
    pub delivered: u64,
    pub failed: u64,
    pub invalid_addresses: u64,
    pub pruned: u64,
}
