//! AlertEvent - Rule Engine output

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Alert derived from a telemetry message whose rule condition held
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    /// Name of the rule that fired
    pub rule: String,

    /// Source topic
    pub topic: String,

    /// Field the rule inspected
    pub field: String,

    /// Triggering reading
    pub value: f64,

    /// Threshold the reading crossed
    pub threshold: f64,

    /// Rendered notification title
    pub title: String,

    /// Rendered notification body
    pub body: String,

    /// Evaluation time
    pub triggered_at: DateTime<Utc>,
}
