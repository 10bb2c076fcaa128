//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// A relay component could not be started
    #[error("Failed to start {component}: {message}")]
    Startup { component: String, message: String },

    /// The broker client gave up
    #[error("Broker connection failed: {message}")]
    Broker { message: String },

    /// A relay task panicked or was cancelled
    #[error("Relay task '{task}' did not finish: {message}")]
    Task { task: String, message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn startup(component: impl Into<String>, message: impl ToString) -> Self {
        Self::Startup {
            component: component.into(),
            message: message.to_string(),
        }
    }

    pub fn broker(message: impl Into<String>) -> Self {
        Self::Broker {
            message: message.into(),
        }
    }

    pub fn task(task: impl Into<String>, message: impl ToString) -> Self {
        Self::Task {
            task: task.into(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
