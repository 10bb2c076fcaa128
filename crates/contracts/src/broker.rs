//! Broker connection state

use serde::Serialize;
use std::fmt;

/// Broker Client connection state machine
///
/// `Disconnected → Connecting → Connected → Reconnecting → Connected | Disconnected`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl BrokerState {
    /// Numeric encoding for gauges
    pub fn as_gauge(&self) -> f64 {
        match self {
            Self::Disconnected => 0.0,
            Self::Connecting => 1.0,
            Self::Connected => 2.0,
            Self::Reconnecting => 3.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for BrokerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
