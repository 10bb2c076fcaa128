//! Ingress error types

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use contracts::ContractError;
use serde_json::json;
use thiserror::Error;

/// Ingress errors
///
/// Only `BadRequest` carries caller-facing detail; everything else answers
/// with a generic 500.
#[derive(Debug, Error)]
pub enum IngressError {
    /// Request rejected by validation
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Registry or other internal failure
    #[error("internal error: {0}")]
    Internal(String),

    /// Listener could not be bound
    #[error("failed to bind {addr}: {message}")]
    Bind { addr: String, message: String },

    /// Server loop failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngressError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ContractError> for IngressError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::InvalidIdentity { message } => Self::BadRequest(message),
            ContractError::InvalidAddress { message, .. } => Self::BadRequest(message),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for IngressError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::BadRequest(message) => message,
            other => {
                tracing::error!(error = %other, "Request failed");
                "internal error".to_string()
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_bad_requests() {
        let err = IngressError::from(ContractError::invalid_address("x", "not an Expo push token"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "bad request: not an Expo push token");

        let err = IngressError::from(ContractError::persistence("registry.json", "disk full"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
