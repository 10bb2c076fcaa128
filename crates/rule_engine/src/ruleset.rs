//! RuleSet - all configured rules

use contracts::{AlertEvent, RuleConfig, TelemetryMessage};
use tracing::trace;

use crate::rule::ThresholdRule;

/// Ordered collection of threshold rules
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<ThresholdRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<ThresholdRule>) -> Self {
        Self { rules }
    }

    pub fn from_configs(configs: &[RuleConfig]) -> Self {
        Self::new(configs.iter().map(ThresholdRule::from).collect())
    }

    /// Every alert fired by `message`, in rule order
    pub fn evaluate(&self, message: &TelemetryMessage) -> Vec<AlertEvent> {
        let alerts: Vec<_> = self
            .rules
            .iter()
            .filter_map(|rule| rule.evaluate(message))
            .collect();
        trace!(topic = %message.topic, fired = alerts.len(), "rules evaluated");
        alerts
    }

    pub fn rules(&self) -> &[ThresholdRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
