//! Queue client contract consumed by the lease and consumer layers.

use crate::error::QueueError;
use crate::message::ReceivedMessage;
use async_trait::async_trait;
use std::time::Duration;

/// Interface to a single queue on an at-least-once, lease-based backend.
///
/// Implementations are bound to one queue and must be safe to share across
/// concurrent tasks; every in-flight lease holds a reference to the same
/// client while the batch loop receives from it.
///
/// Cancellation follows the standard async model: callers race these futures
/// against a cancellation signal and drop them when the signal fires, so
/// implementations should not block outside of `.await` points.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Receive up to `max_messages` messages, hidden from other consumers
    /// for `visibility_timeout`, waiting up to `wait_time` for the queue to
    /// become non-empty (long poll).
    ///
    /// Returns messages in receipt order. An empty vector means the queue had
    /// nothing to deliver within the wait time.
    async fn receive_messages(
        &self,
        max_messages: u32,
        visibility_timeout: Duration,
        wait_time: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError>;

    /// Reset the message's visibility window to `visibility_timeout` from
    /// now. A zero duration makes the message immediately visible again.
    async fn extend_visibility(
        &self,
        message: &ReceivedMessage,
        visibility_timeout: Duration,
    ) -> Result<(), QueueError>;

    /// Permanently delete the message from the queue.
    async fn acknowledge(&self, message: &ReceivedMessage) -> Result<(), QueueError>;
}
