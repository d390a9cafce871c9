//! Message envelope and the identifiers it carries.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use url::Url;

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Address of a queue, e.g. an SQS queue URL.
///
/// Immutable once an output queue has been built around it. This is the queue
/// reference carried by [`crate::QueueError::QueueDoesNotExist`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueueEndpoint(Url);

impl QueueEndpoint {
    /// Create new queue endpoint with validation
    pub fn new(endpoint: &str) -> Result<Self, ValidationError> {
        if endpoint.is_empty() {
            return Err(ValidationError::Required {
                field: "endpoint".to_string(),
            });
        }

        let url = Url::parse(endpoint).map_err(|e| ValidationError::InvalidFormat {
            field: "endpoint".to_string(),
            message: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ValidationError::InvalidFormat {
                field: "endpoint".to_string(),
                message: "must be an absolute http(s) URL".to_string(),
            });
        }

        Ok(Self(url))
    }

    /// Get endpoint as string
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Last path segment of the endpoint, which for SQS is the queue name
    pub fn queue_name(&self) -> Option<&str> {
        self.0
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
    }
}

impl std::fmt::Display for QueueEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueEndpoint {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for QueueEndpoint {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<QueueEndpoint> for String {
    fn from(value: QueueEndpoint) -> Self {
        value.0.into()
    }
}

/// Provider-assigned identifier of an enqueued message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Get message ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "message_id".to_string(),
            });
        }

        Ok(Self(s.to_string()))
    }
}

/// Opaque token issued by a receive, required to acknowledge the message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    /// Create new receipt handle
    pub fn new(handle: String) -> Result<Self, ValidationError> {
        if handle.is_empty() {
            return Err(ValidationError::Required {
                field: "receipt_handle".to_string(),
            });
        }

        Ok(Self(handle))
    }

    /// Get handle string
    pub fn handle(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Message Envelope
// ============================================================================

/// A typed value paired with the metadata the queue assigned to it.
///
/// The two identifiers are kept apart on purpose: `message_id` is what a send
/// returns, `receipt_handle` is what a receive hands out for acknowledgement.
/// Either may be absent depending on how the envelope was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message<T> {
    value: T,
    message_id: Option<MessageId>,
    receipt_handle: Option<ReceiptHandle>,
}

impl<T> Message<T> {
    /// Envelope for a value that was just accepted by the provider
    pub fn sent(value: T, message_id: MessageId) -> Self {
        Self {
            value,
            message_id: Some(message_id),
            receipt_handle: None,
        }
    }

    /// Envelope for a value obtained from a receive operation
    pub fn received(
        value: T,
        message_id: Option<MessageId>,
        receipt_handle: ReceiptHandle,
    ) -> Self {
        Self {
            value,
            message_id,
            receipt_handle: Some(receipt_handle),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn message_id(&self) -> Option<&MessageId> {
        self.message_id.as_ref()
    }

    pub fn receipt_handle(&self) -> Option<&ReceiptHandle> {
        self.receipt_handle.as_ref()
    }

    /// Consume the envelope, keeping only the value
    pub fn into_value(self) -> T {
        self.value
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
