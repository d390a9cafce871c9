//! Queue provider implementations.
//!
//! [`sqs`] holds the provider output queue and the network-client contract it
//! talks through. [`http`] and [`memory`] are the two clients behind that
//! contract: the real SQS Query API, and an in-process fake for tests and local
//! development.

pub mod http;
pub mod memory;
pub mod sqs;

pub use http::HttpSqsClient;
pub use memory::{InMemorySqsApi, RecordedCall, StoredMessage};
pub use sqs::{
    BatchEntry, BatchErrorEntry, BatchResultEntry, EntryOutcome, SendBatchOutput,
    SendMessageOutput, SqsApi, SqsOutputQueue,
};
