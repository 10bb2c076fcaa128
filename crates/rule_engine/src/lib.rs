//! # Rule Engine
//!
//! Threshold evaluation over decoded telemetry.
//!
//! Responsibilities:
//! - Build `ThresholdRule`s from configuration
//! - Fire when `reading >= threshold` (boundary inclusive)
//! - Render alert title/body templates
//! - Output `AlertEvent`
//!
//! ## Usage Example
//!
//! ```ignore
//! use rule_engine::RuleSet;
//!
//! let rules = RuleSet::from_configs(&config.rules);
//!
//! for alert in rules.evaluate(&message) {
//!     dispatcher.dispatch(&alert).await;
//! }
//! ```

mod rule;
mod ruleset;
mod template;

// Re-exports
pub use contracts::{AlertEvent, RuleConfig, TelemetryMessage};
pub use rule::ThresholdRule;
pub use ruleset::RuleSet;
pub use template::{render, TemplateContext};
