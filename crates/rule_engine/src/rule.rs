//! Threshold rule

use chrono::Utc;
use contracts::{
    topic_matches, AlertEvent, RuleConfig, TelemetryMessage, DEFAULT_ALERT_BODY,
    DEFAULT_ALERT_TITLE,
};

use crate::template::{render, TemplateContext};

/// Single threshold rule
///
/// Fires when the reading of `field` is `>= threshold`. Missing or
/// non-numeric readings never fire.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRule {
    pub name: String,
    pub field: String,
    pub threshold: f64,
    /// Only evaluate messages on topics matching this filter
    pub topic: Option<String>,
    pub title: String,
    pub body: String,
}

impl ThresholdRule {
    pub fn new(name: impl Into<String>, field: impl Into<String>, threshold: f64) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            threshold,
            topic: None,
            title: DEFAULT_ALERT_TITLE.to_string(),
            body: DEFAULT_ALERT_BODY.to_string(),
        }
    }

    /// Set the title/body templates
    pub fn with_templates(mut self, title: impl Into<String>, body: impl Into<String>) -> Self {
        self.title = title.into();
        self.body = body.into();
        self
    }

    /// Restrict to topics matching `filter` (`+`/`#` allowed)
    pub fn on_topic(mut self, filter: impl Into<String>) -> Self {
        self.topic = Some(filter.into());
        self
    }

    /// Whether this rule looks at messages on `topic`
    pub fn applies_to(&self, topic: &str) -> bool {
        self.topic
            .as_deref()
            .map_or(true, |filter| topic_matches(filter, topic))
    }

    /// Evaluate one message
    pub fn evaluate(&self, message: &TelemetryMessage) -> Option<AlertEvent> {
        if !self.applies_to(&message.topic) {
            return None;
        }

        let value = message.reading(&self.field)?;
        if value < self.threshold {
            return None;
        }

        let ctx = TemplateContext {
            value,
            field: &self.field,
            topic: &message.topic,
            threshold: self.threshold,
        };

        Some(AlertEvent {
            rule: self.name.clone(),
            topic: message.topic.clone(),
            field: self.field.clone(),
            value,
            threshold: self.threshold,
            title: render(&self.title, &ctx),
            body: render(&self.body, &ctx),
            triggered_at: Utc::now(),
        })
    }
}

impl From<&RuleConfig> for ThresholdRule {
    fn from(config: &RuleConfig) -> Self {
        Self {
            name: config.name.clone(),
            field: config.field.clone(),
            threshold: config.threshold,
            topic: config.topic.clone(),
            title: config.title.clone(),
            body: config.body.clone(),
        }
    }
}
