//! In-memory SQS client for testing and development.
//!
//! [`InMemorySqsApi`] behaves like the subset of SQS an output queue talks to:
//! - Queues must be created before messages can be sent to them
//! - Per-message, per-batch size and entry-count limits are enforced with the
//!   same error codes SQS uses
//! - Every call is recorded, including the ones that fail
//! - Failures can be scripted per call, and individual batch entries can be
//!   rejected to simulate partial batch failures

use crate::error::ProviderError;
use crate::message::QueueEndpoint;
use crate::provider::{ProviderType, SQS_MAX_BATCH_SIZE, SQS_MAX_MESSAGE_SIZE};
use crate::providers::sqs::{
    BatchEntry, BatchErrorEntry, BatchResultEntry, SendBatchOutput, SendMessageOutput, SqsApi,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

type EntryFilter = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// A call made against the in-memory client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    SendMessage {
        queue_url: String,
        body: String,
    },
    SendMessageBatch {
        queue_url: String,
        entries: Vec<BatchEntry>,
    },
}

/// A message accepted by the in-memory client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub message_id: String,
    pub body: String,
}

#[derive(Default)]
struct State {
    queues: HashMap<String, Vec<StoredMessage>>,
    calls: Vec<RecordedCall>,
    scripted_failures: HashMap<usize, ProviderError>,
}

/// In-memory stand-in for the SQS network client
pub struct InMemorySqsApi {
    state: Mutex<State>,
    max_message_size: usize,
    reject_entry: Option<EntryFilter>,
}

impl InMemorySqsApi {
    /// Create a client without queues, using SQS limits
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            max_message_size: SQS_MAX_MESSAGE_SIZE,
            reject_entry: None,
        }
    }

    /// Use a different per-message and per-request size limit
    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    /// Reject batch entries whose body matches the predicate.
    ///
    /// Rejected entries are reported inside an otherwise successful response.
    pub fn reject_entries_where<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.reject_entry = Some(Box::new(predicate));
        self
    }

    pub fn create_queue(&self, queue_url: &QueueEndpoint) {
        self.lock()
            .queues
            .entry(queue_url.as_str().to_string())
            .or_default();
    }

    pub fn delete_queue(&self, queue_url: &QueueEndpoint) {
        self.lock().queues.remove(queue_url.as_str());
    }

    /// Fail the call with the given zero-based index with `error`
    pub fn fail_call(&self, call_index: usize, error: ProviderError) {
        self.lock().scripted_failures.insert(call_index, error);
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Entries of every batch call made so far, in order
    pub fn batch_calls(&self) -> Vec<Vec<BatchEntry>> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RecordedCall::SendMessageBatch { entries, .. } => Some(entries.clone()),
                RecordedCall::SendMessage { .. } => None,
            })
            .collect()
    }

    /// Messages currently held by a queue, in enqueue order
    pub fn messages(&self, queue_url: &QueueEndpoint) -> Vec<StoredMessage> {
        self.lock()
            .queues
            .get(queue_url.as_str())
            .cloned()
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn error(code: &str, message: impl Into<String>) -> ProviderError {
        ProviderError::service(ProviderType::InMemory, code, message, 400)
    }

    fn non_existent_queue(queue_url: &QueueEndpoint) -> ProviderError {
        Self::error(
            "AWS.SimpleQueueService.NonExistentQueue",
            format!("The specified queue does not exist: {}", queue_url),
        )
    }

    fn store(state: &mut State, queue_url: &QueueEndpoint, body: &str) -> Option<String> {
        let queue = state.queues.get_mut(queue_url.as_str())?;
        let message_id = uuid::Uuid::new_v4().to_string();
        queue.push(StoredMessage {
            message_id: message_id.clone(),
            body: body.to_string(),
        });
        Some(message_id)
    }
}

impl Default for InMemorySqsApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SqsApi for InMemorySqsApi {
    async fn send_message(
        &self,
        queue_url: &QueueEndpoint,
        body: &str,
    ) -> Result<SendMessageOutput, ProviderError> {
        let mut state = self.lock();
        let call_index = state.calls.len();
        state.calls.push(RecordedCall::SendMessage {
            queue_url: queue_url.as_str().to_string(),
            body: body.to_string(),
        });

        if let Some(error) = state.scripted_failures.remove(&call_index) {
            return Err(error);
        }

        if !state.queues.contains_key(queue_url.as_str()) {
            return Err(Self::non_existent_queue(queue_url));
        }

        if body.len() > self.max_message_size {
            return Err(Self::error(
                "InvalidParameterValue",
                format!(
                    "One or more parameters are invalid. Reason: Message must be shorter than {} bytes.",
                    self.max_message_size
                ),
            ));
        }

        let message_id =
            Self::store(&mut state, queue_url, body).ok_or_else(|| Self::non_existent_queue(queue_url))?;
        Ok(SendMessageOutput { message_id })
    }

    async fn send_message_batch(
        &self,
        queue_url: &QueueEndpoint,
        entries: &[BatchEntry],
    ) -> Result<SendBatchOutput, ProviderError> {
        let mut state = self.lock();
        let call_index = state.calls.len();
        state.calls.push(RecordedCall::SendMessageBatch {
            queue_url: queue_url.as_str().to_string(),
            entries: entries.to_vec(),
        });

        if let Some(error) = state.scripted_failures.remove(&call_index) {
            return Err(error);
        }

        if !state.queues.contains_key(queue_url.as_str()) {
            return Err(Self::non_existent_queue(queue_url));
        }

        if entries.is_empty() {
            return Err(Self::error(
                "AWS.SimpleQueueService.EmptyBatchRequest",
                "There should be at least one SendMessageBatchRequestEntry in the request.",
            ));
        }

        if entries.len() > SQS_MAX_BATCH_SIZE {
            return Err(Self::error(
                "AWS.SimpleQueueService.TooManyEntriesInBatchRequest",
                format!("Maximum number of entries per request are {}.", SQS_MAX_BATCH_SIZE),
            ));
        }

        let distinct: HashSet<&str> = entries.iter().map(|entry| entry.id.as_str()).collect();
        if distinct.len() != entries.len() {
            return Err(Self::error(
                "AWS.SimpleQueueService.BatchEntryIdsNotDistinct",
                "Two or more batch entries in the request have the same Id.",
            ));
        }

        let total_size: usize = entries.iter().map(|entry| entry.message_body.len()).sum();
        if total_size > self.max_message_size {
            return Err(Self::error(
                "AWS.SimpleQueueService.BatchRequestTooLong",
                format!(
                    "Batch requests cannot be longer than {} bytes.",
                    self.max_message_size
                ),
            ));
        }

        let mut output = SendBatchOutput::default();
        for entry in entries {
            let rejected = self
                .reject_entry
                .as_ref()
                .is_some_and(|reject| reject(&entry.message_body));

            if rejected {
                output.failed.push(BatchErrorEntry {
                    id: entry.id.clone(),
                    code: "InvalidMessageContents".to_string(),
                    message: "Message contains characters outside the allowed set.".to_string(),
                    sender_fault: true,
                });
                continue;
            }

            let message_id = Self::store(&mut state, queue_url, &entry.message_body)
                .ok_or_else(|| Self::non_existent_queue(queue_url))?;
            output.successful.push(BatchResultEntry {
                id: entry.id.clone(),
                message_id,
            });
        }

        Ok(output)
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::InMemory
    }
}
