//! AWS SQS output queue.
//!
//! [`SqsOutputQueue`] turns typed values into SQS `SendMessage` and
//! `SendMessageBatch` calls made through an injected [`SqsApi`] client, and
//! classifies the provider's failures into [`QueueError`] variants.
//!
//! ## Error classification
//!
//! | Operation | Provider code | Result |
//! |---|---|---|
//! | `send` | `AWS.SimpleQueueService.NonExistentQueue`, `QueueDoesNotExist` | [`QueueError::QueueDoesNotExist`] |
//! | `send` | `InvalidParameterValue` | [`QueueError::MessageTooLarge`] |
//! | `send_many` | `AWS.SimpleQueueService.BatchRequestTooLong`, `BatchRequestTooLong` | [`QueueError::MessageTooLarge`] |
//! | any | anything else | [`QueueError::Provider`], unchanged |
//!
//! ## Batches
//!
//! `send_many` splits its input into chunks of at most `batch_limit` values and
//! submits them sequentially. A failing chunk aborts the call; earlier chunks
//! remain enqueued and later chunks are never attempted. A chunk holding a
//! value over `max_item_size` fails with [`QueueError::MessageTooLarge`]
//! before its batch call is made.

use crate::client::OutputQueue;
use crate::codec::{JsonCodec, ValueCodec};
use crate::error::{ProviderError, QueueError};
use crate::message::{Message, MessageId, QueueEndpoint};
use crate::provider::{OutputQueueConfig, ProviderType};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

#[cfg(test)]
#[path = "sqs_tests.rs"]
mod tests;

/// Error codes meaning the target queue is gone
pub const QUEUE_DOES_NOT_EXIST_CODES: &[&str] =
    &["AWS.SimpleQueueService.NonExistentQueue", "QueueDoesNotExist"];

/// Error codes SQS returns for an oversized single message
pub const INVALID_PARAMETER_VALUE_CODES: &[&str] = &["InvalidParameterValue"];

/// Error codes SQS returns when a batch request exceeds the total size limit
pub const BATCH_REQUEST_TOO_LONG_CODES: &[&str] = &[
    "AWS.SimpleQueueService.BatchRequestTooLong",
    "BatchRequestTooLong",
];

// ============================================================================
// Network Client Contract
// ============================================================================

/// One entry of a `SendMessageBatch` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchEntry {
    /// Caller-generated ID, unique within the batch
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "MessageBody")]
    pub message_body: String,
}

impl BatchEntry {
    /// Create an entry with a fresh random ID
    pub fn new(message_body: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            message_body,
        }
    }
}

/// Successful `SendMessage` response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageOutput {
    pub message_id: String,
}

/// An entry the provider accepted in a batch call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResultEntry {
    pub id: String,
    pub message_id: String,
}

/// An entry the provider rejected inside an otherwise successful batch call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchErrorEntry {
    pub id: String,
    pub code: String,
    pub message: String,
    pub sender_fault: bool,
}

/// Successful `SendMessageBatch` response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendBatchOutput {
    pub successful: Vec<BatchResultEntry>,
    pub failed: Vec<BatchErrorEntry>,
}

/// Network client for the SQS operations an output queue needs.
///
/// Implementations must be safe to share between concurrent callers. Failures
/// are reported with the provider's own error code so they can be classified.
#[async_trait]
pub trait SqsApi: Send + Sync {
    /// Enqueue one message body
    async fn send_message(
        &self,
        queue_url: &QueueEndpoint,
        body: &str,
    ) -> Result<SendMessageOutput, ProviderError>;

    /// Enqueue up to ten message bodies in one call
    async fn send_message_batch(
        &self,
        queue_url: &QueueEndpoint,
        entries: &[BatchEntry],
    ) -> Result<SendBatchOutput, ProviderError>;

    /// Provider whose limits apply to this client
    fn provider_type(&self) -> ProviderType {
        ProviderType::AwsSqs
    }
}

// ============================================================================
// Batch Outcomes
// ============================================================================

/// Result of one value passed to [`SqsOutputQueue::send_many_with_outcomes`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Sent {
        message_id: MessageId,
    },
    Failed {
        code: String,
        message: String,
        sender_fault: bool,
    },
}

impl EntryOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

// ============================================================================
// SQS Output Queue
// ============================================================================

/// Output queue writing values of type `T` to one SQS queue.
///
/// Holds only configuration and a shared client handle; every call is
/// independent.
pub struct SqsOutputQueue<T, A, C = JsonCodec> {
    api: Arc<A>,
    codec: C,
    endpoint: QueueEndpoint,
    batch_limit: usize,
    max_item_size: usize,
    _value: PhantomData<fn() -> T>,
}

impl<T, A> SqsOutputQueue<T, A, JsonCodec>
where
    A: SqsApi,
    JsonCodec: ValueCodec<T>,
{
    /// Create an output queue using JSON bodies
    pub fn new(api: Arc<A>, config: OutputQueueConfig) -> Result<Self, QueueError> {
        Self::with_codec(api, config, JsonCodec)
    }
}

impl<T, A, C> SqsOutputQueue<T, A, C>
where
    A: SqsApi,
    C: ValueCodec<T>,
{
    /// Create an output queue with a custom value codec
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Configuration`] if a limit override is outside
    /// what the provider accepts.
    pub fn with_codec(api: Arc<A>, config: OutputQueueConfig, codec: C) -> Result<Self, QueueError> {
        let provider = api.provider_type();
        config.validate(provider)?;

        Ok(Self {
            batch_limit: config.effective_batch_limit(provider),
            max_item_size: config.effective_max_item_size(provider),
            endpoint: config.endpoint,
            api,
            codec,
            _value: PhantomData,
        })
    }

    pub fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    pub fn max_item_size(&self) -> usize {
        self.max_item_size
    }

    /// Decode a raw message body produced by this queue's codec
    pub fn decode(&self, raw: &str) -> Result<T, QueueError> {
        Ok(self.codec.deserialize(raw)?)
    }

    /// Send values in batches and report the outcome of every value.
    ///
    /// Outcomes are returned in input order. Entries the provider rejected
    /// inside a successful batch response are reported as
    /// [`EntryOutcome::Failed`] and do not abort the call; a failing batch
    /// call does, exactly as in [`OutputQueue::send_many`].
    #[instrument(skip(self, values), fields(queue = %self.endpoint, batch_limit = self.batch_limit))]
    pub async fn send_many_with_outcomes<I>(&self, values: I) -> Result<Vec<EntryOutcome>, QueueError>
    where
        I: IntoIterator<Item = T> + Send,
        I::IntoIter: Send,
        T: Send,
    {
        let mut values = values.into_iter();
        let mut outcomes = Vec::new();
        let mut chunk_index = 0usize;

        loop {
            let chunk: Vec<T> = values.by_ref().take(self.batch_limit).collect();
            if chunk.is_empty() {
                break;
            }

            let entries = chunk
                .iter()
                .map(|value| self.codec.serialize(value).map(BatchEntry::new))
                .collect::<Result<Vec<_>, _>>()?;

            // An oversized item fails its whole chunk before any network call
            if let Some(entry) = entries
                .iter()
                .find(|entry| entry.message_body.len() > self.max_item_size)
            {
                warn!(
                    chunk = chunk_index,
                    body_size = entry.message_body.len(),
                    max_item_size = self.max_item_size,
                    "Batch entry exceeds the item size limit"
                );
                return Err(QueueError::MessageTooLarge {
                    max_supported_size: self.max_item_size,
                    message_body: entry.message_body.clone(),
                });
            }

            debug!(chunk = chunk_index, entries = entries.len(), "Sending batch");

            let output = self
                .api
                .send_message_batch(&self.endpoint, &entries)
                .await
                .map_err(|err| self.classify_batch_error(err, &entries))?;

            outcomes.extend(Self::match_outcomes(&entries, output)?);
            chunk_index += 1;
        }

        debug!(chunks = chunk_index, values = outcomes.len(), "Batch send finished");
        Ok(outcomes)
    }

    /// Map a failed `SendMessage` call onto the error taxonomy
    fn classify_send_error(&self, err: ProviderError, message_body: String) -> QueueError {
        if err.has_code(QUEUE_DOES_NOT_EXIST_CODES) {
            return QueueError::QueueDoesNotExist {
                queue: self.endpoint.clone(),
            };
        }

        if err.has_code(INVALID_PARAMETER_VALUE_CODES) {
            return QueueError::MessageTooLarge {
                max_supported_size: self.max_item_size,
                message_body,
            };
        }

        QueueError::Provider(err)
    }

    /// Map a failed `SendMessageBatch` call onto the error taxonomy
    ///
    /// Only the batch-oversize codes are classified; everything else,
    /// including a missing queue, passes through unchanged.
    fn classify_batch_error(&self, err: ProviderError, entries: &[BatchEntry]) -> QueueError {
        if err.has_code(BATCH_REQUEST_TOO_LONG_CODES) {
            return QueueError::MessageTooLarge {
                max_supported_size: self.max_item_size,
                message_body: render_entries(entries),
            };
        }

        QueueError::Provider(err)
    }

    /// Pair every request entry with its result from the batch response
    fn match_outcomes(
        entries: &[BatchEntry],
        output: SendBatchOutput,
    ) -> Result<Vec<EntryOutcome>, QueueError> {
        let mut sent: HashMap<String, String> = output
            .successful
            .into_iter()
            .map(|entry| (entry.id, entry.message_id))
            .collect();
        let mut failed: HashMap<String, BatchErrorEntry> = output
            .failed
            .into_iter()
            .map(|entry| (entry.id.clone(), entry))
            .collect();

        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(raw_id) = sent.remove(&entry.id) {
                let message_id = raw_id.parse::<MessageId>().map_err(|_| {
                    ProviderError::malformed_response(
                        ProviderType::AwsSqs,
                        format!("empty MessageId for batch entry {}", entry.id),
                    )
                })?;
                outcomes.push(EntryOutcome::Sent { message_id });
            } else if let Some(error) = failed.remove(&entry.id) {
                warn!(
                    entry_id = %entry.id,
                    code = %error.code,
                    sender_fault = error.sender_fault,
                    "Batch entry rejected by provider"
                );
                outcomes.push(EntryOutcome::Failed {
                    code: error.code,
                    message: error.message,
                    sender_fault: error.sender_fault,
                });
            } else {
                warn!(entry_id = %entry.id, "Batch entry missing from provider response");
                outcomes.push(EntryOutcome::Failed {
                    code: ProviderError::MALFORMED_RESPONSE.to_string(),
                    message: "entry missing from batch response".to_string(),
                    sender_fault: false,
                });
            }
        }

        Ok(outcomes)
    }
}

/// JSON array of `{"Id", "MessageBody"}` objects, in request order
fn render_entries(entries: &[BatchEntry]) -> String {
    serde_json::Value::Array(
        entries
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "Id": entry.id,
                    "MessageBody": entry.message_body,
                })
            })
            .collect(),
    )
    .to_string()
}

impl<T, A, C> fmt::Debug for SqsOutputQueue<T, A, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqsOutputQueue")
            .field("endpoint", &self.endpoint)
            .field("batch_limit", &self.batch_limit)
            .field("max_item_size", &self.max_item_size)
            .finish()
    }
}

#[async_trait]
impl<T, A, C> OutputQueue<T> for SqsOutputQueue<T, A, C>
where
    T: Send + Sync + 'static,
    A: SqsApi,
    C: ValueCodec<T>,
{
    #[instrument(skip(self, value), fields(queue = %self.endpoint))]
    async fn send(&self, value: T) -> Result<Message<T>, QueueError> {
        let message_body = self.codec.serialize(&value)?;

        if message_body.len() > self.max_item_size {
            return Err(QueueError::MessageTooLarge {
                max_supported_size: self.max_item_size,
                message_body,
            });
        }

        debug!(body_size = message_body.len(), "Sending message");

        let result = self.api.send_message(&self.endpoint, &message_body).await;
        let output = match result {
            Ok(output) => output,
            Err(err) => return Err(self.classify_send_error(err, message_body)),
        };

        let message_id = output.message_id.parse::<MessageId>().map_err(|_| {
            ProviderError::malformed_response(
                self.api.provider_type(),
                "SendMessage response carried an empty MessageId",
            )
        })?;

        debug!(message_id = %message_id, "Message sent");
        Ok(Message::sent(value, message_id))
    }

    async fn send_many<I>(&self, values: I) -> Result<(), QueueError>
    where
        I: IntoIterator<Item = T> + Send,
        I::IntoIter: Send,
    {
        let outcomes = self.send_many_with_outcomes(values).await?;

        let failed = outcomes.iter().filter(|outcome| !outcome.is_sent()).count();
        if failed > 0 {
            warn!(
                queue = %self.endpoint,
                failed,
                total = outcomes.len(),
                "Some batch entries were rejected by the provider"
            );
        }

        Ok(())
    }

    fn endpoint(&self) -> &QueueEndpoint {
        &self.endpoint
    }
}
