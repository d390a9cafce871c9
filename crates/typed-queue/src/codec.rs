//! Value codecs turning typed values into message bodies and back.
//!
//! The value type is a compile-time parameter of the codec implementation, so
//! deserialization always knows its target type.

use crate::error::SerializationError;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;

/// Converts values of type `T` to text message bodies and back.
///
/// Implementations must round-trip: `deserialize(serialize(v)) == v`.
pub trait ValueCodec<T>: Send + Sync {
    fn serialize(&self, value: &T) -> Result<String, SerializationError>;

    fn deserialize(&self, raw: &str) -> Result<T, SerializationError>;
}

/// JSON codec for any serde type
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> ValueCodec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &T) -> Result<String, SerializationError> {
        Ok(serde_json::to_string(value)?)
    }

    fn deserialize(&self, raw: &str) -> Result<T, SerializationError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Plain-text codec: strings travel verbatim, scalars as their textual form
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl<T> ValueCodec<T> for TextCodec
where
    T: Display + FromStr,
    T::Err: Display,
{
    fn serialize(&self, value: &T) -> Result<String, SerializationError> {
        Ok(value.to_string())
    }

    fn deserialize(&self, raw: &str) -> Result<T, SerializationError> {
        raw.parse().map_err(|e: T::Err| SerializationError::Parse {
            type_name: std::any::type_name::<T>(),
            raw: raw.to_string(),
            message: e.to_string(),
        })
    }
}
