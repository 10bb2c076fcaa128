//! Push messages, provider receipts, and per-recipient delivery outcomes

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AlertEvent;

/// Delivery priority hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushPriority {
    Default,
    Normal,
    #[default]
    High,
}

/// Provider-neutral notification addressed to one recipient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    /// Recipient address
    pub to: String,
    pub title: String,
    pub body: String,
    /// Sound hint (e.g. "default"); omitted when `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    pub priority: PushPriority,
    /// Extra payload delivered to the app
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl PushMessage {
    /// Build the notification for one recipient from an alert
    pub fn from_alert(
        to: impl Into<String>,
        event: &AlertEvent,
        sound: Option<String>,
        priority: PushPriority,
        data: Option<Value>,
    ) -> Self {
        Self {
            to: to.into(),
            title: event.title.clone(),
            body: event.body.clone(),
            sound,
            priority,
            data,
        }
    }
}

/// Provider error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptErrorKind {
    /// Address is unknown or expired at the provider
    DeviceNotRegistered,
    MessageTooBig,
    MessageRateExceeded,
    InvalidCredentials,
    Other,
}

/// Per-message answer from the provider
#[derive(Debug, Clone, PartialEq)]
pub enum PushReceipt {
    Ok { id: Option<String> },
    Error { message: String, kind: ReceiptErrorKind },
}

/// Outcome of delivering one alert to one subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Success { ticket_id: Option<String> },
    Failure { reason: String },
    InvalidAddress { reason: String },
}

impl DeliveryOutcome {
    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Failure { .. } => "failure",
            Self::InvalidAddress { .. } => "invalid_address",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl From<PushReceipt> for DeliveryOutcome {
    fn from(receipt: PushReceipt) -> Self {
        match receipt {
            PushReceipt::Ok { id } => Self::Success { ticket_id: id },
            PushReceipt::Error {
                message,
                kind: ReceiptErrorKind::DeviceNotRegistered,
            } => Self::InvalidAddress { reason: message },
            PushReceipt::Error { message, .. } => Self::Failure { reason: message },
        }
    }
}

/// One delivery attempt; logged and counted, never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryAttempt {
    pub identity: String,
    pub address: String,
    pub outcome: DeliveryOutcome,
}
