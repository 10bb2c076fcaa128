//! Layered error definitions
//!
//! Categorized by source: config / registration / broker / delivery / persistence

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Registration Errors =====
    /// Registration identity missing or empty
    #[error("invalid identity: {message}")]
    InvalidIdentity { message: String },

    /// Notification address rejected by the provider format check
    #[error("invalid address '{address}': {message}")]
    InvalidAddress { address: String, message: String },

    // ===== Broker Errors =====
    /// Telemetry payload could not be decoded
    #[error("decode error on topic '{topic}': {message}")]
    Decode { topic: String, message: String },

    /// Broker unreachable or connection dropped
    #[error("broker connection error: {message}")]
    BrokerConnection { message: String },

    // ===== Delivery Errors =====
    /// Push provider call failed
    #[error("provider '{provider}' delivery error: {message}")]
    Delivery { provider: String, message: String },

    // ===== Persistence Errors =====
    /// Registry snapshot could not be loaded or stored
    #[error("persistence error at '{path}': {message}")]
    Persistence { path: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid identity error
    pub fn invalid_identity(message: impl Into<String>) -> Self {
        Self::InvalidIdentity {
            message: message.into(),
        }
    }

    /// Create invalid address error
    pub fn invalid_address(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Create decode error
    pub fn decode(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Create broker connection error
    pub fn broker_connection(message: impl Into<String>) -> Self {
        Self::BrokerConnection {
            message: message.into(),
        }
    }

    /// Create delivery error
    pub fn delivery(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create persistence error
    pub fn persistence(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error stems from caller input (surfaces as a client error)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentity { .. } | Self::InvalidAddress { .. }
        )
    }
}
