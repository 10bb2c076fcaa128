//! Broker client error types

use contracts::ContractError;
use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Connect attempt rejected or failed
    #[error("broker connect failed: {message}")]
    ConnectFailed {
        /// Error message
        message: String,
    },

    /// Connect attempt exceeded the configured timeout
    #[error("broker connect timed out after {timeout_ms}ms")]
    ConnectTimeout {
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// Established session dropped
    #[error("broker connection lost: {message}")]
    ConnectionLost {
        /// Error message
        message: String,
    },

    /// Payload could not be decoded into telemetry
    #[error("failed to decode payload on '{topic}': {message}")]
    Decode {
        /// Topic the payload arrived on
        topic: String,
        /// Error message
        message: String,
    },

    /// Reconnect budget spent
    #[error("gave up after {attempts} failed connect attempts")]
    RetriesExhausted {
        /// Consecutive failed attempts
        attempts: u32,
    },
}

impl IngestionError {
    pub fn connect_failed(message: impl Into<String>) -> Self {
        Self::ConnectFailed {
            message: message.into(),
        }
    }

    pub fn connection_lost(message: impl Into<String>) -> Self {
        Self::ConnectionLost {
            message: message.into(),
        }
    }

    pub fn decode(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            topic: topic.into(),
            message: message.into(),
        }
    }
}

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::Decode { topic, message } => ContractError::decode(topic, message),
            other => ContractError::broker_connection(other.to_string()),
        }
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
