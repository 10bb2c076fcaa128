//! Relay statistics and summary output.

use std::time::Duration;

use observability::DispatchSummary;

/// Totals collected when the relay stops
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    /// Time between start and shutdown
    pub duration: Duration,

    /// Broker client counters
    pub ingestion: ingestion::MetricsSnapshot,

    /// Dispatcher counters
    pub dispatch: dispatcher::MetricsSnapshot,

    /// Outcome aggregation per alert
    pub summary: DispatchSummary,

    /// Alerts emitted by the rule stage
    pub alerts_fired: u64,

    /// Registry size at shutdown
    pub subscribers: usize,

    /// Set when the broker client ended on its own
    pub broker_error: Option<String>,
}

impl RelayStats {
    /// Telemetry messages per second over the whole run
    pub fn message_rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.ingestion.messages_received as f64 / secs
        } else {
            0.0
        }
    }

    /// Print the shutdown summary to stdout
    pub fn print_summary(&self) {
        let ingestion = &self.ingestion;
        let dispatch = &self.dispatch;

        println!();
        println!("╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Push Relay Summary                      ║");
        println!("╠══════════════════════════════════════════════════════════════╣");
        println!(
            "║  Duration:            {:>10.2}s                            ║",
            self.duration.as_secs_f64()
        );
        println!(
            "║  Messages received:   {:>10}  ({:>8.2} msg/s)            ║",
            ingestion.messages_received,
            self.message_rate()
        );
        println!(
            "║  Decode errors:       {:>10}                               ║",
            ingestion.decode_errors
        );
        println!(
            "║  Broker connects:     {:>10}  (failures: {:>6})          ║",
            ingestion.connects, ingestion.connect_failures
        );
        println!("╠══════════════════════════════════════════════════════════════╣");
        println!(
            "║  Alerts fired:        {:>10}                               ║",
            self.alerts_fired
        );
        println!(
            "║  Batches sent:        {:>10}  (failed: {:>4}, timeout: {:>4}) ║",
            dispatch.batches, dispatch.batch_failures, dispatch.batch_timeouts
        );
        println!(
            "║  Delivered:           {:>10}  ({:>6.2}%)                    ║",
            dispatch.delivered, self.summary.success_rate
        );
        println!(
            "║  Failed:              {:>10}                               ║",
            dispatch.failed
        );
        println!(
            "║  Invalid addresses:   {:>10}  (pruned: {:>6})            ║",
            dispatch.invalid_addresses, dispatch.pruned
        );
        println!(
            "║  Subscribers:         {:>10}                               ║",
            self.subscribers
        );
        println!("╚══════════════════════════════════════════════════════════════╝");

        if !self.summary.rule_counts.is_empty() {
            println!("\nAlerts per rule:");
            let mut rules: Vec<_> = self.summary.rule_counts.iter().collect();
            rules.sort();
            for (rule, count) in rules {
                println!("  {rule}: {count}");
            }
        }

        if let Some(ref error) = self.broker_error {
            println!("\n✗ Broker: {error}");
        }
        println!();
    }
}
