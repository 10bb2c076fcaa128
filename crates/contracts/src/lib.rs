//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Data Flow
//! - device → Ingress → `SubscriberStore` (write)
//! - broker → `TelemetryMessage` → `AlertEvent` → `PushProvider`
//!   (reads a `SubscriberStore` snapshot) → `DeliveryAttempt`

mod address;
mod alert;
mod broker;
mod config;
mod delivery;
mod error;
mod provider;
mod store;
mod subscriber;
mod telemetry;
mod topic;

pub use address::AddressFormat;
pub use alert::AlertEvent;
pub use broker::BrokerState;
pub use config::*;
pub use delivery::*;
pub use error::*;
pub use provider::{LocalPushProvider, PushProvider};
pub use store::{LocalSubscriberStore, SubscriberStore};
pub use subscriber::Subscriber;
pub use telemetry::TelemetryMessage;
pub use topic::topic_matches;
