//! Tests for the per-message lease.
//!
//! All tests run on a paused tokio clock, so heartbeat timing is exact: a
//! lease held for 350ms with a 100ms heartbeat issues precisely three
//! renewals, at 100ms, 200ms and 300ms.

use super::*;
use crate::memory::{InMemoryQueueClient, Operation};

const VISIBILITY: Duration = Duration::from_secs(42);
const HEARTBEAT: Duration = Duration::from_millis(100);
const RETRY_DELAY: Duration = Duration::from_secs(2520);

/// Push one message and lease it, returning the lease and its message ID.
async fn leased_message(
    client: &Arc<InMemoryQueueClient>,
    cancel: &CancellationToken,
) -> (MessageLease, crate::message::MessageId) {
    let message_id = client.push_message("qux");
    let mut batch = client
        .receive_messages(1, VISIBILITY, Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(batch.len(), 1);

    let queue_client: Arc<dyn QueueClient> = Arc::clone(client) as Arc<dyn QueueClient>;
    let lease = MessageLease::new(
        queue_client,
        batch.remove(0),
        VISIBILITY,
        HEARTBEAT,
        cancel.clone(),
    );
    (lease, message_id)
}

fn extend_operations(operations: &[Operation]) -> Vec<Duration> {
    operations
        .iter()
        .filter_map(|operation| match operation {
            Operation::Extend {
                visibility_timeout, ..
            } => Some(*visibility_timeout),
            _ => None,
        })
        .collect()
}

fn acknowledge_count(operations: &[Operation]) -> usize {
    operations
        .iter()
        .filter(|operation| matches!(operation, Operation::Acknowledge { .. }))
        .count()
}

/// Verify the normal path: heartbeats renew the window while the lease is
/// held, and releasing with Delete acknowledges exactly once with no
/// further queue calls afterwards.
#[tokio::test(start_paused = true)]
async fn test_heartbeats_then_delete() {
    let client = Arc::new(InMemoryQueueClient::new());
    let cancel = CancellationToken::new();
    let (lease, message_id) = leased_message(&client, &cancel).await;

    tokio::time::sleep(Duration::from_millis(350)).await;

    lease.release(ReleaseOutcome::Delete).await.unwrap();

    let operations = client.operations();
    assert_eq!(extend_operations(&operations), vec![VISIBILITY; 3]);
    assert_eq!(acknowledge_count(&operations), 1);
    assert_eq!(
        operations.last(),
        Some(&Operation::Acknowledge { message_id })
    );

    // No further heartbeat may fire after release has returned.
    let calls_after_release = operations.len();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(client.operations().len(), calls_after_release);
}

/// Verify releasing before the first heartbeat issues exactly one terminal
/// call and zero renewals.
#[tokio::test(start_paused = true)]
async fn test_release_before_first_heartbeat() {
    let client = Arc::new(InMemoryQueueClient::new());
    let cancel = CancellationToken::new();
    let (lease, _) = leased_message(&client, &cancel).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    lease.release(ReleaseOutcome::Delete).await.unwrap();

    let operations = client.operations();
    assert!(extend_operations(&operations).is_empty());
    assert_eq!(acknowledge_count(&operations), 1);
}

/// Verify releasing with a retry delay leaves the message enqueued behind
/// the requested visibility change instead of deleting it.
#[tokio::test(start_paused = true)]
async fn test_release_with_retry_delay() {
    let client = Arc::new(InMemoryQueueClient::new());
    let cancel = CancellationToken::new();
    let (lease, message_id) = leased_message(&client, &cancel).await;

    lease
        .release(ReleaseOutcome::RetryAfter(RETRY_DELAY))
        .await
        .unwrap();

    let operations = client.operations();
    assert_eq!(acknowledge_count(&operations), 0);
    assert_eq!(
        operations.last(),
        Some(&Operation::Extend {
            message_id,
            visibility_timeout: RETRY_DELAY,
        })
    );
    // Still invisible until the delay lapses.
    assert_eq!(client.ready_len(), 0);
    assert_eq!(client.in_flight_len(), 1);
}

/// Verify releasing with RetryImmediately makes the message visible again
/// with no delay.
#[tokio::test(start_paused = true)]
async fn test_release_retry_immediately() {
    let client = Arc::new(InMemoryQueueClient::new());
    let cancel = CancellationToken::new();
    let (lease, _) = leased_message(&client, &cancel).await;

    lease
        .release(ReleaseOutcome::RetryImmediately)
        .await
        .unwrap();

    let operations = client.operations();
    assert_eq!(extend_operations(&operations), vec![Duration::ZERO]);
    assert_eq!(client.ready_len(), 1);
}

/// Verify cancellation self-releases the lease: an extend-to-zero fires, a
/// later release reports Cancelled, and the message is never deleted.
#[tokio::test(start_paused = true)]
async fn test_cancelled_lease_self_releases() {
    let client = Arc::new(InMemoryQueueClient::new());
    let cancel = CancellationToken::new();
    let (lease, _) = leased_message(&client, &cancel).await;

    tokio::time::sleep(Duration::from_millis(250)).await;
    cancel.cancel();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let operations = client.operations();
    assert_eq!(
        extend_operations(&operations),
        vec![VISIBILITY, VISIBILITY, Duration::ZERO]
    );
    assert_eq!(acknowledge_count(&operations), 0);
    assert_eq!(client.ready_len(), 1);

    let result = lease.release(ReleaseOutcome::Delete).await;
    assert!(matches!(result, Err(QueueError::Cancelled)));

    // The terminal action must not have happened after the failed release.
    assert_eq!(acknowledge_count(&client.operations()), 0);
}

/// Verify a lease dropped without release makes its message visible again
/// instead of leaving it invisible for a full window.
#[tokio::test(start_paused = true)]
async fn test_dropped_lease_makes_message_visible() {
    let client = Arc::new(InMemoryQueueClient::new());
    let cancel = CancellationToken::new();
    let (lease, _) = leased_message(&client, &cancel).await;

    drop(lease);
    tokio::time::sleep(Duration::from_millis(10)).await;

    let operations = client.operations();
    assert_eq!(extend_operations(&operations), vec![Duration::ZERO]);
    assert_eq!(client.ready_len(), 1);
}

/// Verify the release result surfaces the terminal queue call's error.
#[tokio::test(start_paused = true)]
async fn test_release_surfaces_queue_error() {
    let client = Arc::new(InMemoryQueueClient::new());
    let cancel = CancellationToken::new();
    let (lease, _) = leased_message(&client, &cancel).await;

    // Acknowledge out of band so the lease's own delete hits an expired
    // receipt.
    client
        .acknowledge(lease.message())
        .await
        .expect("out-of-band acknowledge");

    let result = lease.release(ReleaseOutcome::Delete).await;
    assert!(matches!(result, Err(QueueError::MessageNotFound { .. })));
}
