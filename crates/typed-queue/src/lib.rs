//! # Typed Queue
//!
//! Typed producer-side access to message queues, with AWS SQS as the provider.
//!
//! Callers hand in values of their own type `T`; the queue serializes them with
//! a [`ValueCodec`], sends them one at a time or in provider-sized batches, and
//! maps the provider's failures onto a small error taxonomy.
//!
//! ## Module Organization
//!
//! - [`error`] - Error types for all queue operations
//! - [`message`] - Message envelope, identifiers and queue endpoints
//! - [`codec`] - Value serialization
//! - [`client`] - The output queue contract
//! - [`provider`] - Provider types, limits and configuration
//! - [`providers`] - SQS output queue and its network clients
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use typed_queue::{HttpSqsClient, OutputQueue, OutputQueueConfig, QueueEndpoint};
//! use typed_queue::{SqsClientConfig, SqsOutputQueue};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(HttpSqsClient::new(SqsClientConfig {
//!     access_key_id: Some("AKID".to_string()),
//!     secret_access_key: Some("secret".to_string()),
//!     ..SqsClientConfig::default()
//! })?);
//!
//! let endpoint = QueueEndpoint::new("https://sqs.us-east-1.amazonaws.com/123456789012/orders")?;
//! let queue: SqsOutputQueue<u64, _> = SqsOutputQueue::new(client, OutputQueueConfig::new(endpoint))?;
//!
//! let message = queue.send(42).await?;
//! println!("sent {:?}", message.message_id());
//!
//! queue.send_many(0..25).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod error;
pub mod message;
pub mod provider;
pub mod providers;

// Re-export commonly used types at crate root for convenience
pub use client::OutputQueue;
pub use codec::{JsonCodec, TextCodec, ValueCodec};
pub use error::{
    ConfigurationError, ProviderError, QueueError, SerializationError, ValidationError,
};
pub use message::{Message, MessageId, QueueEndpoint, ReceiptHandle};
pub use provider::{
    OutputQueueConfig, ProviderType, SqsClientConfig, SQS_MAX_BATCH_SIZE, SQS_MAX_MESSAGE_SIZE,
};
pub use providers::{EntryOutcome, HttpSqsClient, InMemorySqsApi, SqsApi, SqsOutputQueue};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
