//! Provider types, limits and configuration.

use crate::error::ConfigurationError;
use crate::message::QueueEndpoint;
use serde::{Deserialize, Serialize};

/// Maximum number of entries AWS SQS accepts in one `SendMessageBatch` call
pub const SQS_MAX_BATCH_SIZE: usize = 10;

/// Maximum SQS message body size in bytes (256 KiB)
pub const SQS_MAX_MESSAGE_SIZE: usize = 256 * 1024;

/// Enumeration of supported queue providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderType {
    AwsSqs,
    InMemory,
}

impl ProviderType {
    /// Get maximum number of items per batch call for provider
    pub fn max_batch_size(&self) -> usize {
        match self {
            Self::AwsSqs => SQS_MAX_BATCH_SIZE,
            Self::InMemory => SQS_MAX_BATCH_SIZE,
        }
    }

    /// Get maximum serialized message size for provider
    pub fn max_message_size(&self) -> usize {
        match self {
            Self::AwsSqs => SQS_MAX_MESSAGE_SIZE,
            Self::InMemory => SQS_MAX_MESSAGE_SIZE,
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwsSqs => write!(f, "AwsSqs"),
            Self::InMemory => write!(f, "InMemory"),
        }
    }
}

/// Construction-time configuration of an output queue.
///
/// The limits default to the provider's own limits; overrides may only lower
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputQueueConfig {
    pub endpoint: QueueEndpoint,
    #[serde(default)]
    pub batch_limit: Option<usize>,
    #[serde(default)]
    pub max_item_size: Option<usize>,
}

impl OutputQueueConfig {
    /// Create configuration for an endpoint with provider-default limits
    pub fn new(endpoint: QueueEndpoint) -> Self {
        Self {
            endpoint,
            batch_limit: None,
            max_item_size: None,
        }
    }

    /// Override the number of items sent per batch call
    pub fn with_batch_limit(mut self, batch_limit: usize) -> Self {
        self.batch_limit = Some(batch_limit);
        self
    }

    /// Override the maximum serialized size of a single item
    pub fn with_max_item_size(mut self, max_item_size: usize) -> Self {
        self.max_item_size = Some(max_item_size);
        self
    }

    /// Resolve the effective batch limit for a provider
    pub fn effective_batch_limit(&self, provider: ProviderType) -> usize {
        self.batch_limit.unwrap_or_else(|| provider.max_batch_size())
    }

    /// Resolve the effective item size limit for a provider
    pub fn effective_max_item_size(&self, provider: ProviderType) -> usize {
        self.max_item_size
            .unwrap_or_else(|| provider.max_message_size())
    }

    /// Check that overrides lie within what the provider accepts
    pub fn validate(&self, provider: ProviderType) -> Result<(), ConfigurationError> {
        if let Some(limit) = self.batch_limit {
            if limit == 0 || limit > provider.max_batch_size() {
                return Err(ConfigurationError::Invalid {
                    message: format!(
                        "batch_limit must be between 1 and {}, got {}",
                        provider.max_batch_size(),
                        limit
                    ),
                });
            }
        }

        if let Some(size) = self.max_item_size {
            if size == 0 || size > provider.max_message_size() {
                return Err(ConfigurationError::Invalid {
                    message: format!(
                        "max_item_size must be between 1 and {}, got {}",
                        provider.max_message_size(),
                        size
                    ),
                });
            }
        }

        Ok(())
    }
}

/// AWS SQS network client configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqsClientConfig {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Token accompanying temporary credentials
    #[serde(default)]
    pub session_token: Option<String>,
    /// Service endpoint override, e.g. a LocalStack URL
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for SqsClientConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            endpoint_url: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl SqsClientConfig {
    /// Service endpoint requests are sent to
    pub fn service_endpoint(&self) -> String {
        match &self.endpoint_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://sqs.{}.amazonaws.com", self.region),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.region.is_empty() {
            return Err(ConfigurationError::Missing {
                key: "region".to_string(),
            });
        }

        if self.timeout_seconds == 0 {
            return Err(ConfigurationError::Invalid {
                message: "timeout_seconds must be greater than zero".to_string(),
            });
        }

        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(ConfigurationError::Invalid {
                message: "access_key_id and secret_access_key must be set together".to_string(),
            });
        }

        if self.session_token.is_some() && self.access_key_id.is_none() {
            return Err(ConfigurationError::Invalid {
                message: "session_token requires access_key_id and secret_access_key".to_string(),
            });
        }

        Ok(())
    }
}

impl std::fmt::Debug for SqsClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqsClientConfig")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("endpoint_url", &self.endpoint_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
