//! Relay metric recorders
//!
//! Thin wrappers over the `metrics` facade plus an in-memory aggregator for
//! the shutdown summary.

use std::collections::HashMap;

use contracts::{BrokerState, DeliveryAttempt};
use metrics::{counter, gauge, histogram};

/// Record an inbound broker message
pub fn record_telemetry_received(topic: &str) {
    counter!(
        "push_relay_telemetry_received_total",
        "topic" => topic.to_string()
    )
    .increment(1);
}

/// Record a payload that failed to decode
pub fn record_decode_error(topic: &str) {
    counter!(
        "push_relay_decode_errors_total",
        "topic" => topic.to_string()
    )
    .increment(1);
}

/// Record a broker state transition
pub fn record_broker_state(state: BrokerState) {
    gauge!("push_relay_broker_state").set(state.as_gauge());
}

/// Record a reconnect attempt
pub fn record_broker_reconnect() {
    counter!("push_relay_broker_reconnects_total").increment(1);
}

/// Record a fired alert
pub fn record_alert(rule: &str) {
    counter!("push_relay_alerts_total", "rule" => rule.to_string()).increment(1);
}

/// Record one per-recipient delivery outcome
pub fn record_delivery(provider: &str, attempt: &DeliveryAttempt) {
    counter!(
        "push_relay_deliveries_total",
        "provider" => provider.to_string(),
        "outcome" => attempt.outcome.label()
    )
    .increment(1);
}

/// Record the wall time of one provider batch call
pub fn record_batch_latency_ms(provider: &str, latency_ms: f64) {
    histogram!(
        "push_relay_batch_latency_ms",
        "provider" => provider.to_string()
    )
    .record(latency_ms);
}

/// Record an address pruned after the provider rejected it
pub fn record_pruned_address() {
    counter!("push_relay_pruned_addresses_total").increment(1);
}

/// Record a registration request result ("ok", "invalid", "error")
pub fn record_registration(result: &'static str) {
    counter!("push_relay_registrations_total", "result" => result).increment(1);
}

/// Record the current registry size
pub fn record_subscriber_count(count: usize) {
    gauge!("push_relay_subscribers").set(count as f64);
}

/// Dispatch aggregator
///
/// Aggregates delivery outcomes in memory for the shutdown summary.
#[derive(Debug, Clone, Default)]
pub struct DispatchAggregator {
    /// Dispatched alerts
    pub total_alerts: u64,

    /// Successful deliveries
    pub delivered: u64,

    /// Failed deliveries
    pub failed: u64,

    /// Deliveries rejected as invalid address
    pub invalid_addresses: u64,

    /// Per-alert fan-out size
    pub fanout_stats: RunningStats,

    /// Alerts per rule
    pub rule_counts: HashMap<String, u64>,
}

impl DispatchAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one dispatched alert into the totals
    pub fn update(&mut self, rule: &str, attempts: &[DeliveryAttempt]) {
        self.total_alerts += 1;
        *self.rule_counts.entry(rule.to_string()).or_insert(0) += 1;
        self.fanout_stats.push(attempts.len() as f64);

        for attempt in attempts {
            match attempt.outcome.label() {
                "success" => self.delivered += 1,
                "invalid_address" => self.invalid_addresses += 1,
                _ => self.failed += 1,
            }
        }
    }

    pub fn summary(&self) -> DispatchSummary {
        let total = self.delivered + self.failed + self.invalid_addresses;
        DispatchSummary {
            total_alerts: self.total_alerts,
            delivered: self.delivered,
            failed: self.failed,
            invalid_addresses: self.invalid_addresses,
            success_rate: if total > 0 {
                self.delivered as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            fanout: StatsSummary::from(&self.fanout_stats),
            rule_counts: self.rule_counts.clone(),
        }
    }
}

/// Dispatch summary
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub total_alerts: u64,
    pub delivered: u64,
    pub failed: u64,
    pub invalid_addresses: u64,
    pub success_rate: f64,
    pub fanout: StatsSummary,
    pub rule_counts: HashMap<String, u64>,
}

impl std::fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Alerts: {}", self.total_alerts)?;
        writeln!(
            f,
            "Delivered: {} ({:.2}%)",
            self.delivered, self.success_rate
        )?;
        writeln!(f, "Failed: {}", self.failed)?;
        writeln!(f, "Invalid addresses: {}", self.invalid_addresses)?;
        writeln!(f, "Fan-out: {}", self.fanout)?;

        if !self.rule_counts.is_empty() {
            writeln!(f, "Alerts per rule:")?;
            for (rule, count) in &self.rule_counts {
                writeln!(f, "  {}: {}", rule, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
