//! Producer-side queue contract.

use crate::error::QueueError;
use crate::message::{Message, QueueEndpoint};
use async_trait::async_trait;

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Write side of a typed queue.
///
/// Implementations hold no mutable state between calls, so one instance can be
/// shared by concurrent callers. Calls are never retried internally; delivery
/// is at-least-once and repeating a failed call may duplicate messages.
#[async_trait]
pub trait OutputQueue<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Send a single value.
    ///
    /// Returns the envelope carrying the value and the provider-issued message
    /// ID. Fails with [`QueueError::QueueDoesNotExist`] when the queue is gone
    /// and with [`QueueError::MessageTooLarge`] when the serialized value is
    /// over the item size limit; any other provider failure is passed through.
    async fn send(&self, value: T) -> Result<Message<T>, QueueError>;

    /// Send a possibly unbounded sequence of values in batches.
    ///
    /// Batches are submitted one at a time in input order. The first failing
    /// batch aborts the call; batches sent before it stay enqueued.
    async fn send_many<I>(&self, values: I) -> Result<(), QueueError>
    where
        I: IntoIterator<Item = T> + Send,
        I::IntoIter: Send;

    /// Address of the queue this instance writes to
    fn endpoint(&self) -> &QueueEndpoint;
}
