//! In-memory queue client for testing and development.
//!
//! This module provides a functional in-memory implementation of the
//! [`QueueClient`] contract that:
//! - Implements visibility windows over the tokio clock (so paused-clock
//!   tests are deterministic)
//! - Redelivers messages whose window lapses, tracking delivery counts
//! - Records every queue operation for assertion in tests

use crate::client::QueueClient;
use crate::error::QueueError;
use crate::message::{MessageId, ReceiptHandle, ReceivedMessage};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

/// A queue call observed by the in-memory client, in invocation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Receive {
        count: usize,
    },
    Extend {
        message_id: MessageId,
        visibility_timeout: Duration,
    },
    Acknowledge {
        message_id: MessageId,
    },
}

/// A message held by the in-memory queue
struct StoredMessage {
    message_id: MessageId,
    body: Bytes,
    attributes: HashMap<String, String>,
    delivery_count: u32,
}

/// A delivered message waiting to be acknowledged or to reappear
struct InFlightMessage {
    message: StoredMessage,
    invisible_until: Instant,
    // Delivery order, so same-instant expiries re-queue FIFO.
    sequence: u64,
}

struct QueueState {
    ready: VecDeque<StoredMessage>,
    in_flight: HashMap<ReceiptHandle, InFlightMessage>,
    operations: Vec<Operation>,
    next_receipt: u64,
}

impl QueueState {
    fn new() -> Self {
        Self {
            ready: VecDeque::new(),
            in_flight: HashMap::new(),
            operations: Vec::new(),
            next_receipt: 0,
        }
    }

    /// Move in-flight messages whose window lapsed back to the ready queue,
    /// in the order they were delivered
    fn reap_expired(&mut self, now: Instant) {
        let mut expired: Vec<(u64, ReceiptHandle)> = self
            .in_flight
            .iter()
            .filter(|(_, in_flight)| in_flight.invisible_until <= now)
            .map(|(receipt, in_flight)| (in_flight.sequence, receipt.clone()))
            .collect();
        expired.sort_by_key(|(sequence, _)| *sequence);

        for (_, receipt) in expired {
            if let Some(in_flight) = self.in_flight.remove(&receipt) {
                self.ready.push_back(in_flight.message);
            }
        }
    }

    fn deliver(
        &mut self,
        max_messages: u32,
        visibility_timeout: Duration,
        now: Instant,
    ) -> Vec<ReceivedMessage> {
        self.reap_expired(now);

        let mut batch = Vec::new();
        while batch.len() < max_messages as usize {
            let Some(mut stored) = self.ready.pop_front() else {
                break;
            };

            stored.delivery_count += 1;
            self.next_receipt += 1;
            let receipt = ReceiptHandle::new(format!("receipt-{}", self.next_receipt));

            let received = ReceivedMessage {
                message_id: stored.message_id.clone(),
                receipt_handle: receipt.clone(),
                body: stored.body.clone(),
                attributes: stored.attributes.clone(),
                delivery_count: stored.delivery_count,
                received_at: Utc::now(),
            };

            self.in_flight.insert(
                receipt,
                InFlightMessage {
                    message: stored,
                    invisible_until: now + visibility_timeout,
                    sequence: self.next_receipt,
                },
            );
            batch.push(received);
        }

        batch
    }
}

/// In-memory queue client implementation
pub struct InMemoryQueueClient {
    state: Mutex<QueueState>,
}

impl InMemoryQueueClient {
    /// Create an empty in-memory queue
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::new()),
        }
    }

    /// Enqueue a message, returning its generated ID
    pub fn push_message(&self, body: impl Into<Bytes>) -> MessageId {
        let message_id = MessageId::new();
        let mut state = self.state.lock().expect("queue state poisoned");
        state.ready.push_back(StoredMessage {
            message_id: message_id.clone(),
            body: body.into(),
            attributes: HashMap::new(),
            delivery_count: 0,
        });
        message_id
    }

    /// Snapshot of every queue call made so far, in order
    pub fn operations(&self) -> Vec<Operation> {
        let state = self.state.lock().expect("queue state poisoned");
        state.operations.clone()
    }

    /// Number of messages currently ready for delivery
    pub fn ready_len(&self) -> usize {
        let mut state = self.state.lock().expect("queue state poisoned");
        state.reap_expired(Instant::now());
        state.ready.len()
    }

    /// Number of messages currently delivered but unacknowledged
    pub fn in_flight_len(&self) -> usize {
        let mut state = self.state.lock().expect("queue state poisoned");
        state.reap_expired(Instant::now());
        state.in_flight.len()
    }
}

impl Default for InMemoryQueueClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueClient for InMemoryQueueClient {
    async fn receive_messages(
        &self,
        max_messages: u32,
        visibility_timeout: Duration,
        wait_time: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let mut batch = {
            let mut state = self.state.lock().expect("queue state poisoned");
            state.deliver(max_messages, visibility_timeout, Instant::now())
        };

        // Long poll: one re-check after the wait window, which under a
        // paused tokio clock also lets lapsed visibility windows expire.
        if batch.is_empty() && !wait_time.is_zero() {
            tokio::time::sleep(wait_time).await;
            let mut state = self.state.lock().expect("queue state poisoned");
            batch = state.deliver(max_messages, visibility_timeout, Instant::now());
        }

        let mut state = self.state.lock().expect("queue state poisoned");
        state.operations.push(Operation::Receive { count: batch.len() });
        Ok(batch)
    }

    async fn extend_visibility(
        &self,
        message: &ReceivedMessage,
        visibility_timeout: Duration,
    ) -> Result<(), QueueError> {
        let mut state = self.state.lock().expect("queue state poisoned");

        let in_flight = state
            .in_flight
            .get_mut(&message.receipt_handle)
            .ok_or_else(|| QueueError::MessageNotFound {
                receipt: message.receipt_handle.to_string(),
            })?;
        in_flight.invisible_until = Instant::now() + visibility_timeout;

        state.operations.push(Operation::Extend {
            message_id: message.message_id.clone(),
            visibility_timeout,
        });
        Ok(())
    }

    async fn acknowledge(&self, message: &ReceivedMessage) -> Result<(), QueueError> {
        let mut state = self.state.lock().expect("queue state poisoned");

        state
            .in_flight
            .remove(&message.receipt_handle)
            .ok_or_else(|| QueueError::MessageNotFound {
                receipt: message.receipt_handle.to_string(),
            })?;

        state.operations.push(Operation::Acknowledge {
            message_id: message.message_id.clone(),
        });
        Ok(())
    }
}
