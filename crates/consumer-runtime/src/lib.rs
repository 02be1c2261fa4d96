//! # Consumer Runtime
//!
//! Lease-based batch consumer runtime for at-least-once message queues —
//! queues where a received-but-unacknowledged message stays invisible to
//! other consumers for a bounded visibility window that must be proactively
//! extended or the message reappears.
//!
//! This library provides:
//! - Per-message leases with autonomous heartbeat renewal
//! - A batch consumption loop with first-failure short-circuiting
//! - Handler-driven terminal outcomes: delete, delayed retry, immediate retry
//! - Cooperative cancellation that makes in-flight messages visible again
//! - An in-memory queue client for testing and development
//!
//! ## Module Organization
//!
//! - [`error`] - Error taxonomy for queue, handler, and loop failures
//! - [`message`] - Received message structures and receipt handles
//! - [`config`] - Consumer configuration surface
//! - [`client`] - The queue client contract consumed by this crate
//! - [`lease`] - The per-message lease and its heartbeat task
//! - [`consumer`] - The batch consumption loop
//! - [`memory`] - In-memory queue client
//!
//! ## Example
//!
//! ```no_run
//! use consumer_runtime::{
//!     ConsumerConfig, HandlerError, InMemoryQueueClient, QueueConsumer,
//! };
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(InMemoryQueueClient::new());
//! client.push_message("work item");
//!
//! let mut config = ConsumerConfig::default();
//! config.queue_url = "memory://work".to_string();
//! config.forever = false;
//!
//! let consumer = QueueConsumer::new(client, config);
//! let consumed = consumer
//!     .consume_messages(CancellationToken::new(), |_cancel: CancellationToken, body: String| async move {
//!         println!("handling {body}");
//!         Ok::<(), HandlerError>(())
//!     })
//!     .await?;
//! assert_eq!(consumed, 1);
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod client;
pub mod config;
pub mod consumer;
pub mod error;
pub mod lease;
pub mod memory;
pub mod message;

// Re-export commonly used types at crate root for convenience
pub use client::QueueClient;
pub use config::ConsumerConfig;
pub use consumer::{MessageHandler, QueueConsumer};
pub use error::{
    ConfigurationError, ConsumeError, ConsumeErrorKind, HandlerError, QueueError, ValidationError,
};
pub use lease::{MessageLease, ReleaseOutcome};
pub use memory::InMemoryQueueClient;
pub use message::{MessageId, ReceiptHandle, ReceivedMessage};
