//! Batch consumption loop driving handlers over leased messages.

use crate::client::QueueClient;
use crate::config::ConsumerConfig;
use crate::error::{ConsumeError, ConsumeErrorKind, HandlerError};
use crate::lease::{MessageLease, ReleaseOutcome};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

#[cfg(test)]
#[path = "consumer_tests.rs"]
mod tests;

/// Processes a single message body.
///
/// The cancellation token is the one governing the whole consumption run;
/// long-running handlers should observe it and return promptly when it fires.
/// The message's lease keeps renewing independently for as long as the
/// handler runs, so there is no deadline to beat beyond cancellation itself.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle one message body.
    ///
    /// # Errors
    ///
    /// [`HandlerError::Retry`] schedules redelivery after the carried delay;
    /// [`HandlerError::Fatal`] aborts the batch loop.
    async fn handle(&self, cancel: &CancellationToken, body: &str) -> Result<(), HandlerError>;
}

#[async_trait]
impl<F, Fut> MessageHandler for F
where
    F: Fn(CancellationToken, String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    async fn handle(&self, cancel: &CancellationToken, body: &str) -> Result<(), HandlerError> {
        self(cancel.clone(), body.to_string()).await
    }
}

/// Consumes batches of messages from a lease-based queue.
///
/// Holds no message state between calls; every received message lives in its
/// own [`MessageLease`] for the duration of one batch.
pub struct QueueConsumer {
    client: Arc<dyn QueueClient>,
    config: ConsumerConfig,
}

impl QueueConsumer {
    /// Create a consumer over the given queue client.
    pub fn new(client: Arc<dyn QueueClient>, config: ConsumerConfig) -> Self {
        Self { client, config }
    }

    /// The consumer's configuration
    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Consume messages using the given handler until the queue is exhausted
    /// (unless configured to poll forever), a fatal failure occurs, or the
    /// token is cancelled.
    ///
    /// Each message is leased the instant its batch arrives and stays
    /// invisible to other consumers until its handler returns. Handlers run
    /// sequentially in receipt order; after the first fatal outcome in a
    /// batch, remaining messages are released unprocessed for immediate
    /// redelivery and no further batch is received.
    ///
    /// Returns the count of successfully deleted messages. On failure the
    /// returned [`ConsumeError`] carries the same count alongside the first
    /// fatal cause.
    pub async fn consume_messages<H>(
        &self,
        cancel: CancellationToken,
        handler: H,
    ) -> Result<u64, ConsumeError>
    where
        H: MessageHandler,
    {
        let mut consumed: u64 = 0;

        loop {
            debug!(
                queue = %self.config.queue_url,
                max_messages = self.config.max_messages,
                visibility_timeout = ?self.config.visibility_timeout(),
                wait_time = ?self.config.wait_time(),
                "Receive messages"
            );

            let messages = tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    return Err(ConsumeError::new(consumed, ConsumeErrorKind::Cancelled));
                }

                result = self.client.receive_messages(
                    self.config.max_messages,
                    self.config.visibility_timeout(),
                    self.config.wait_time(),
                ) => match result {
                    Ok(messages) => messages,
                    Err(queue_error) => {
                        error!(error = %queue_error, "Failed to receive messages");
                        return Err(ConsumeError::new(
                            consumed,
                            ConsumeErrorKind::Receive(queue_error),
                        ));
                    }
                },
            };

            debug!(messages = messages.len(), "Received messages");

            if messages.is_empty() {
                if self.config.forever {
                    continue;
                }
                return Ok(consumed);
            }

            // Lease every message before any handler runs, so renewal covers
            // the whole batch from the start.
            let leases: Vec<MessageLease> = messages
                .into_iter()
                .map(|message| {
                    MessageLease::new(
                        Arc::clone(&self.client),
                        message,
                        self.config.visibility_timeout(),
                        self.config.heartbeat_interval(),
                        cancel.clone(),
                    )
                })
                .collect();

            // Process in receipt order, short-circuiting after the first
            // fatal outcome. The first fatal cause wins: release errors on
            // the skip path never overwrite it.
            let mut failure: Option<ConsumeErrorKind> = None;

            for lease in leases {
                if failure.is_some() {
                    let _ = lease.release(ReleaseOutcome::RetryImmediately).await;
                    continue;
                }

                let message_id = lease.message().message_id.clone();
                let result = {
                    let body = lease.message().body_text();
                    handler.handle(&cancel, &body).await
                };

                match result {
                    Ok(()) => match lease.release(ReleaseOutcome::Delete).await {
                        Ok(()) => consumed += 1,
                        Err(queue_error) => {
                            failure = Some(ConsumeErrorKind::Release(queue_error));
                        }
                    },
                    Err(HandlerError::Retry { delay }) => {
                        warn!(
                            message_id = %message_id,
                            retry_delay = ?delay,
                            "Schedule message processing to be retried later"
                        );
                        if let Err(queue_error) =
                            lease.release(ReleaseOutcome::RetryAfter(delay)).await
                        {
                            failure = Some(ConsumeErrorKind::Release(queue_error));
                        }
                    }
                    Err(HandlerError::Fatal(handler_error)) => {
                        error!(
                            message_id = %message_id,
                            error = %handler_error,
                            "Failed to process message"
                        );
                        let _ = lease.release(ReleaseOutcome::RetryImmediately).await;
                        failure = Some(ConsumeErrorKind::Handler(handler_error));
                    }
                }
            }

            if let Some(kind) = failure {
                return Err(ConsumeError::new(consumed, kind));
            }
        }
    }
}
