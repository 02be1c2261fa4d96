//! Error types for queue consumption.

use std::time::Duration;
use thiserror::Error;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

/// Transport-level errors reported by the queue backend
#[derive(Debug, Clone, Error)]
pub enum QueueError {
    #[error("Queue not found: {queue}")]
    QueueNotFound { queue: String },

    #[error("Message not found or receipt expired: {receipt}")]
    MessageNotFound { receipt: String },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Provider error: {code} - {message}")]
    Provider { code: String, message: String },

    #[error("Operation cancelled")]
    Cancelled,
}

impl QueueError {
    /// Check if error is transient and the operation may be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::QueueNotFound { .. } => false,
            Self::MessageNotFound { .. } => false,
            Self::ConnectionFailed { .. } => true,
            Self::Timeout { .. } => true,
            Self::Provider { .. } => true,
            Self::Cancelled => false,
        }
    }
}

/// Failure outcome of a message handler.
///
/// A handler that returns `Ok(())` marks its message as consumed. The two
/// failure variants distinguish "reprocess this later" from "stop the batch":
///
/// - [`HandlerError::Retry`] schedules redelivery after the carried delay and
///   lets the batch continue.
/// - [`HandlerError::Fatal`] makes the message visible again immediately and
///   aborts the batch loop.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Handler requested retry in {delay:?}")]
    Retry { delay: Duration },

    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

impl HandlerError {
    /// Request redelivery of the current message after `delay`
    pub fn retry_after(delay: Duration) -> Self {
        Self::Retry { delay }
    }

    /// Report an unrecoverable processing failure
    pub fn fatal(error: impl Into<anyhow::Error>) -> Self {
        Self::Fatal(error.into())
    }
}

/// Terminal error of a consumption run.
///
/// Carries the number of messages durably deleted before the run stopped, so
/// partial progress survives the failure.
#[derive(Debug, Error)]
#[error("Consumption stopped after {consumed} consumed message(s)")]
pub struct ConsumeError {
    consumed: u64,
    #[source]
    kind: ConsumeErrorKind,
}

impl ConsumeError {
    pub(crate) fn new(consumed: u64, kind: ConsumeErrorKind) -> Self {
        Self { consumed, kind }
    }

    /// Number of messages successfully deleted before the run stopped
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// The underlying cause
    pub fn kind(&self) -> &ConsumeErrorKind {
        &self.kind
    }

    /// Consume the error, returning its cause
    pub fn into_kind(self) -> ConsumeErrorKind {
        self.kind
    }
}

/// Cause of a terminated consumption run
#[derive(Debug, Error)]
pub enum ConsumeErrorKind {
    #[error("Failed to receive messages: {0}")]
    Receive(#[source] QueueError),

    #[error("Message processing failed: {0}")]
    Handler(#[source] anyhow::Error),

    #[error("Failed to release message lease: {0}")]
    Release(#[source] QueueError),

    #[error("Consumption cancelled")]
    Cancelled,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },
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
