//! Per-message lease with autonomous visibility renewal.

use crate::client::QueueClient;
use crate::error::QueueError;
use crate::message::ReceivedMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;

/// Terminal outcome applied to a leased message on release
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Permanently delete the message (successful processing)
    Delete,
    /// Leave the message enqueued, reappearing after the given delay
    RetryAfter(Duration),
    /// Make the message visible again with no delay
    RetryImmediately,
}

struct ReleaseRequest {
    outcome: ReleaseOutcome,
    reply: oneshot::Sender<Result<(), QueueError>>,
}

/// Holds one received message invisible to other consumers until released.
///
/// The invisibility is guaranteed by a background task which periodically
/// resets the visibility window of the leased message. The task exits through
/// exactly one of three doors:
///
/// - [`release`](Self::release) is called: the terminal queue operation runs,
///   its result is handed back, and the heartbeat stops before `release`
///   returns.
/// - The cancellation token fires: the message is made immediately visible
///   again (best effort) and any later `release` call reports
///   [`QueueError::Cancelled`].
/// - The lease is dropped without being released: treated like cancellation,
///   so the message is not left invisible for a full window.
///
/// `release` consumes the lease, so releasing twice is not expressible.
pub struct MessageLease {
    message: ReceivedMessage,
    request: mpsc::Sender<ReleaseRequest>,
}

impl MessageLease {
    /// Lease the given message and start its heartbeat task.
    ///
    /// Renewal begins immediately: the first visibility extension is issued
    /// one `heartbeat_interval` after this call, each extension resetting the
    /// window to `visibility_timeout`.
    pub fn new(
        client: Arc<dyn QueueClient>,
        message: ReceivedMessage,
        visibility_timeout: Duration,
        heartbeat_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (request_tx, request_rx) = mpsc::channel(1);

        let task = LeaseTask {
            client,
            message: message.clone(),
            visibility_timeout,
            heartbeat_interval,
            cancel,
            request: request_rx,
        };
        tokio::spawn(task.run());

        Self {
            message,
            request: request_tx,
        }
    }

    /// The leased message
    pub fn message(&self) -> &ReceivedMessage {
        &self.message
    }

    /// Release the lease with the given terminal outcome.
    ///
    /// Issues exactly one queue call — acknowledge for
    /// [`ReleaseOutcome::Delete`], a visibility change otherwise — and
    /// returns its result. When this method returns, the heartbeat task has
    /// exited and no further queue calls will be made for this message.
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying queue call, or
    /// [`QueueError::Cancelled`] when the lease already self-released because
    /// its cancellation token fired.
    pub async fn release(self, outcome: ReleaseOutcome) -> Result<(), QueueError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = ReleaseRequest {
            outcome,
            reply: reply_tx,
        };

        if self.request.send(request).await.is_err() {
            return Err(QueueError::Cancelled);
        }

        match reply_rx.await {
            Ok(result) => result,
            Err(_) => Err(QueueError::Cancelled),
        }
    }
}

/// State owned by the background heartbeat task. Nothing here is shared; the
/// task communicates with the lease handle solely through the release
/// channel.
struct LeaseTask {
    client: Arc<dyn QueueClient>,
    message: ReceivedMessage,
    visibility_timeout: Duration,
    heartbeat_interval: Duration,
    cancel: CancellationToken,
    request: mpsc::Receiver<ReleaseRequest>,
}

impl LeaseTask {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                maybe_request = self.request.recv() => {
                    match maybe_request {
                        Some(request) => {
                            let result = self.apply(request.outcome).await;
                            let _ = request.reply.send(result);
                        }
                        None => {
                            // Lease handle dropped without release.
                            debug!(
                                message_id = %self.message.message_id,
                                "Lease dropped without release, making message visible"
                            );
                            let _ = self.change_visibility(Duration::ZERO).await;
                        }
                    }
                    return;
                }

                _ = self.cancel.cancelled() => {
                    let _ = self.change_visibility(Duration::ZERO).await;
                    return;
                }

                _ = tokio::time::sleep(self.heartbeat_interval) => {
                    let _ = self.change_visibility(self.visibility_timeout).await;
                }
            }
        }
    }

    async fn apply(&self, outcome: ReleaseOutcome) -> Result<(), QueueError> {
        match outcome {
            ReleaseOutcome::Delete => self.delete_message().await,
            ReleaseOutcome::RetryAfter(delay) => self.change_visibility(delay).await,
            ReleaseOutcome::RetryImmediately => self.change_visibility(Duration::ZERO).await,
        }
    }

    async fn delete_message(&self) -> Result<(), QueueError> {
        if let Err(error) = self.client.acknowledge(&self.message).await {
            error!(
                message_id = %self.message.message_id,
                error = %error,
                "Failed to delete message"
            );
            return Err(error);
        }
        info!(
            message_id = %self.message.message_id,
            "Message deleted"
        );
        Ok(())
    }

    async fn change_visibility(&self, visibility_timeout: Duration) -> Result<(), QueueError> {
        if let Err(error) = self
            .client
            .extend_visibility(&self.message, visibility_timeout)
            .await
        {
            warn!(
                message_id = %self.message.message_id,
                visibility_timeout = ?visibility_timeout,
                error = %error,
                "Failed to update visibility timeout"
            );
            return Err(error);
        }
        debug!(
            message_id = %self.message.message_id,
            visibility_timeout = ?visibility_timeout,
            "Visibility timeout updated"
        );
        Ok(())
    }
}
