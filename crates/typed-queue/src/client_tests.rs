//! Contract tests for the output queue trait.

use super::*;
use crate::codec::TextCodec;
use crate::provider::OutputQueueConfig;
use crate::providers::{InMemorySqsApi, SqsOutputQueue};
use std::sync::Arc;

// ============================================================================
// Contract Tests - OutputQueue Trait
// ============================================================================

/// A single send returns the value and a non-empty message ID
async fn test_output_queue_send_success<Q: OutputQueue<String>>(queue: &Q) {
    // Act
    let result = queue.send("hello".to_string()).await;

    // Assert
    let message = result.expect("Send should succeed");
    assert_eq!(message.value(), "hello");
    let message_id = message.message_id().expect("Sent message carries an ID");
    assert!(!message_id.as_str().is_empty());
    assert!(message.receipt_handle().is_none());
}

/// Sending to a missing queue names that queue in the error
async fn test_output_queue_send_to_missing_queue<Q: OutputQueue<String>>(queue: &Q) {
    // Act
    let result = queue.send("orphan".to_string()).await;

    // Assert
    match result {
        Err(QueueError::QueueDoesNotExist { queue: endpoint }) => {
            assert_eq!(&endpoint, queue.endpoint());
        }
        other => panic!("Expected QueueDoesNotExist, got: {:?}", other),
    }
}

/// An empty input is a successful no-op
async fn test_output_queue_send_many_empty<Q: OutputQueue<String>>(queue: &Q) {
    let result = queue.send_many(Vec::<String>::new()).await;
    assert!(result.is_ok(), "Empty send_many should succeed");
}

/// Any finite input is accepted
async fn test_output_queue_send_many_success<Q: OutputQueue<String>>(queue: &Q) {
    let values: Vec<String> = (0..23).map(|i| format!("value-{}", i)).collect();
    let result = queue.send_many(values).await;
    assert!(result.is_ok(), "send_many should succeed: {:?}", result);
}

// ============================================================================
// SqsOutputQueue over the in-memory client
// ============================================================================

fn endpoint() -> QueueEndpoint {
    QueueEndpoint::new("http://localhost:4566/000000000000/contract").unwrap()
}

fn queue_over(api: Arc<InMemorySqsApi>) -> SqsOutputQueue<String, InMemorySqsApi, TextCodec> {
    SqsOutputQueue::with_codec(api, OutputQueueConfig::new(endpoint()), TextCodec).unwrap()
}

fn api_with_queue() -> Arc<InMemorySqsApi> {
    let api = Arc::new(InMemorySqsApi::new());
    api.create_queue(&endpoint());
    api
}

#[tokio::test]
async fn test_sqs_output_queue_send_success() {
    let api = api_with_queue();
    let queue = queue_over(api.clone());

    test_output_queue_send_success(&queue).await;

    assert_eq!(api.messages(&endpoint()).len(), 1);
}

#[tokio::test]
async fn test_sqs_output_queue_send_to_missing_queue() {
    let queue = queue_over(Arc::new(InMemorySqsApi::new()));

    test_output_queue_send_to_missing_queue(&queue).await;
}

#[tokio::test]
async fn test_sqs_output_queue_send_many_empty() {
    let api = api_with_queue();
    let queue = queue_over(api.clone());

    test_output_queue_send_many_empty(&queue).await;

    assert!(api.calls().is_empty(), "No provider call for empty input");
}

#[tokio::test]
async fn test_sqs_output_queue_send_many_success() {
    let api = api_with_queue();
    let queue = queue_over(api.clone());

    test_output_queue_send_many_success(&queue).await;

    let sizes: Vec<usize> = api.batch_calls().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![10, 10, 3]);
    assert_eq!(api.messages(&endpoint()).len(), 23);
}

/// Verify the trait can be used as a shared handle across tasks.
#[tokio::test]
async fn test_output_queue_is_shareable() {
    let api = api_with_queue();
    let queue = Arc::new(queue_over(api.clone()));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.send(format!("task-{}", i)).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(api.messages(&endpoint()).len(), 4);
}
