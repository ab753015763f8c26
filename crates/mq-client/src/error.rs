//! Error types for queue operations.

use crate::status::{FailureCategory, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Operation that was in progress when the transport reported a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Open,
    Send,
    Receive,
    Close,
    Create,
    Delete,
}

impl Operation {
    /// Human-readable description of the failed action
    pub fn description(&self) -> &'static str {
        match self {
            Self::Open => "cannot open queue",
            Self::Send => "cannot send",
            Self::Receive => "cannot receive",
            Self::Close => "cannot close",
            Self::Create => "cannot create queue",
            Self::Delete => "cannot delete queue",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Comprehensive error type for all queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("{operation} (hr={})", status.category())]
    Transport {
        operation: Operation,
        status: StatusCode,
    },

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    ConfigurationError(#[from] ConfigurationError),

    #[error("Serialization failed: {0}")]
    SerializationError(#[from] SerializationError),
}

impl QueueError {
    /// Build the error reported for an operation on a closed handle
    pub(crate) fn closed(operation: Operation) -> Self {
        Self::Transport {
            operation,
            status: StatusCode::INVALID_HANDLE,
        }
    }

    /// Get the raw transport status, if the error came from the transport
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Transport { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the failure category, if the error came from the transport
    pub fn category(&self) -> Option<FailureCategory> {
        self.status().map(|status| status.category())
    }

    /// Get the operation that failed, if the error came from the transport
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Transport { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// Check if the error is a receive or peek that ran out of time
    pub fn is_timeout(&self) -> bool {
        self.category() == Some(FailureCategory::IoTimeout)
    }

    /// Check if error is transient and the caller may retry
    pub fn is_transient(&self) -> bool {
        match self.category() {
            Some(category) => category.is_availability(),
            None => false,
        }
    }

    /// Check if error should be retried
    pub fn should_retry(&self) -> bool {
        self.is_transient()
    }

    /// Get suggested retry delay
    pub fn retry_after(&self) -> Option<Duration> {
        match self.category()? {
            FailureCategory::IoTimeout => Some(Duration::ZERO),
            FailureCategory::ServiceUnavailable
            | FailureCategory::RemoteMachineUnavailable
            | FailureCategory::DirectoryServiceUnavailable => Some(Duration::from_secs(5)),
            _ => None,
        }
    }
}

/// Errors during message body conversion
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("JSON serialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Message body is not valid UTF-8")]
    InvalidUtf8,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Transport initialization failed: {status}")]
    TransportInitialization { status: StatusCode },
}

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
