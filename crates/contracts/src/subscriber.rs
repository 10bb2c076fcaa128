//! Subscriber - a registered notification recipient

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered device
///
/// One current address per identity; re-registration overwrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    /// Opaque identity (user or device id)
    pub identity: String,

    /// Provider-specific notification address
    pub address: String,

    /// Time of the latest registration
    pub registered_at: DateTime<Utc>,
}

impl Subscriber {
    /// Create a subscriber registered now
    pub fn new(identity: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            address: address.into(),
            registered_at: Utc::now(),
        }
    }
}
