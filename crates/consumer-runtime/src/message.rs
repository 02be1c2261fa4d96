//! Message types for queue consumption.

use crate::error::ValidationError;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::collections::HashMap;
use std::str::FromStr;

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;

/// Unique identifier for messages within the queue system
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    /// Generate new random message ID
    pub fn new() -> Self {
        let id = uuid::Uuid::new_v4();
        Self(id.to_string())
    }

    /// Get message ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "message_id".to_string(),
            });
        }

        Ok(Self(s.to_string()))
    }
}

/// Opaque token for acknowledging or extending received messages.
///
/// Issued by the queue backend on receive; every subsequent visibility or
/// acknowledge call for that delivery must present it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    /// Create new receipt handle
    pub fn new(handle: String) -> Self {
        Self(handle)
    }

    /// Get handle string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message received from the queue.
///
/// Owned by the queue backend; this crate treats it as read-only. The message
/// stays invisible to other consumers for the visibility window negotiated at
/// receive time, after which it reappears unless acknowledged or re-extended.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub message_id: MessageId,
    pub receipt_handle: ReceiptHandle,
    pub body: Bytes,
    pub attributes: HashMap<String, String>,
    pub delivery_count: u32,
    pub received_at: DateTime<Utc>,
}

impl ReceivedMessage {
    /// Create a received message with empty attributes and a first delivery.
    pub fn new(message_id: MessageId, receipt_handle: ReceiptHandle, body: Bytes) -> Self {
        Self {
            message_id,
            receipt_handle,
            body,
            attributes: HashMap::new(),
            delivery_count: 1,
            received_at: Utc::now(),
        }
    }

    /// Add a backend-supplied attribute
    pub fn with_attribute(mut self, key: String, value: String) -> Self {
        self.attributes.insert(key, value);
        self
    }

    /// Set the delivery count reported by the backend
    pub fn with_delivery_count(mut self, count: u32) -> Self {
        self.delivery_count = count;
        self
    }

    /// Get the message body as text.
    ///
    /// Handlers consume bodies as text; invalid UTF-8 sequences are replaced
    /// rather than rejected, matching the opaque-payload contract.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Check if message has exceeded maximum delivery count
    pub fn has_exceeded_max_delivery_count(&self, max_count: u32) -> bool {
        self.delivery_count > max_count
    }
}
