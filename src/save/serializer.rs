//! Payload serializer collaborator
//!
//! The save engine never looks inside a payload. It hands the typed value to
//! a [`PayloadSerializer`] and stores whatever bytes come back.
//!
//! # Design Pattern: Trait-based Serialization
//!
//! The trait is generic over the payload type rather than having generic
//! methods, so `Arc<dyn PayloadSerializer<T>>` is a valid trait object and a
//! slot can be handed any encoding (JSON, a binary format, encryption
//! wrappers) at construction time.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::BoxError;

/// Options forwarded to the serializer on every call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializerOptions {
    /// Human-readable output (indentation, newlines)
    pub pretty: bool,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        SerializerOptions { pretty: true }
    }
}

/// Encodes and decodes one payload type to and from bytes
pub trait PayloadSerializer<T>: Send + Sync {
    fn encode(&self, payload: &T, options: &SerializerOptions) -> Result<Vec<u8>, BoxError>;

    fn decode(&self, bytes: &[u8], options: &SerializerOptions) -> Result<T, BoxError>;
}

/// JSON encoding via serde_json
///
/// Works for any payload implementing serde's `Serialize` and
/// `DeserializeOwned`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl<T> PayloadSerializer<T> for JsonSerializer
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, payload: &T, options: &SerializerOptions) -> Result<Vec<u8>, BoxError> {
        let bytes = if options.pretty {
            serde_json::to_vec_pretty(payload)?
        } else {
            serde_json::to_vec(payload)?
        };
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8], _options: &SerializerOptions) -> Result<T, BoxError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
