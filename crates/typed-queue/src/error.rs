//! Error types for queue operations.
//!
//! Only two provider failures are classified into domain errors:
//! [`QueueError::QueueDoesNotExist`] and [`QueueError::MessageTooLarge`]. Every
//! other provider failure is surfaced unchanged as [`QueueError::Provider`].

use crate::message::QueueEndpoint;
use crate::provider::ProviderType;
use thiserror::Error;

/// Error type for all producer-side queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue does not exist: {queue}")]
    QueueDoesNotExist { queue: QueueEndpoint },

    #[error("Message too large: maximum supported size is {max_supported_size} bytes")]
    MessageTooLarge {
        max_supported_size: usize,
        message_body: String,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl QueueError {
    /// Check if the caller may reasonably retry the failed operation.
    ///
    /// Nothing in this crate retries on its own; this is advice for callers.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::QueueDoesNotExist { .. } => false,
            Self::MessageTooLarge { .. } => false,
            Self::Provider(err) => err.is_transient(),
            Self::Serialization(_) => false,
            Self::Configuration(_) => false,
            Self::Validation(_) => false,
        }
    }

    /// The provider-native error, when this error was passed through unclassified
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Provider(err) => Some(err),
            _ => None,
        }
    }
}

/// Failure reported by a provider network client.
///
/// Carries the provider's machine-readable error code untouched so that callers
/// can inspect failures this crate does not classify.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Provider error ({provider}): {code} - {message}")]
pub struct ProviderError {
    pub provider: ProviderType,
    pub code: String,
    pub message: String,
    /// HTTP status of the failed call, if a response was received at all
    pub status: Option<u16>,
}

impl ProviderError {
    /// Code used when the request never produced an HTTP response
    pub const TRANSPORT: &'static str = "Transport";
    /// Code used when a success response could not be interpreted
    pub const MALFORMED_RESPONSE: &'static str = "MalformedResponse";
    /// Code used when a request cannot be signed
    pub const MISSING_CREDENTIALS: &'static str = "MissingCredentials";

    /// Create an error from a provider service response
    pub fn service(
        provider: ProviderType,
        code: impl Into<String>,
        message: impl Into<String>,
        status: u16,
    ) -> Self {
        Self {
            provider,
            code: code.into(),
            message: message.into(),
            status: Some(status),
        }
    }

    /// Create an error raised on the client side, without a provider response
    pub fn local(
        provider: ProviderType,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            code: code.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create an error for a request that failed before a response arrived
    pub fn transport(provider: ProviderType, message: impl Into<String>) -> Self {
        Self::local(provider, Self::TRANSPORT, message)
    }

    /// Create an error for a success response with an unexpected body
    pub fn malformed_response(provider: ProviderType, message: impl Into<String>) -> Self {
        Self::local(provider, Self::MALFORMED_RESPONSE, message)
    }

    /// Check whether the error code matches any of the given codes
    pub fn has_code(&self, codes: &[&str]) -> bool {
        codes.iter().any(|code| self.code == *code)
    }

    /// Check if error is transient and the call could succeed when repeated
    pub fn is_transient(&self) -> bool {
        if self.code == Self::TRANSPORT {
            return true;
        }

        if matches!(
            self.code.as_str(),
            "ThrottlingException" | "RequestThrottled" | "ServiceUnavailable"
        ) {
            return true;
        }

        matches!(self.status, Some(status) if status >= 500)
    }
}

/// Errors during value serialization/deserialization
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("JSON serialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Cannot parse '{raw}' as {type_name}: {message}")]
    Parse {
        type_name: &'static str,
        raw: String,
        message: String,
    },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },
}

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
