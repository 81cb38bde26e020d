//! Envelope Codec Module
//!
//! Turns cached values into file bytes and back. Values are wrapped in a
//! one-element array before serialization so a stored `null` or `false`
//! never looks like a missing entry.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{CacheError, Result};

// == Serializer ==
/// Pluggable byte format for the envelope.
pub trait Serializer: Send + Sync {
    fn serialize(&self, value: &Value) -> Result<Vec<u8>>;

    fn deserialize(&self, bytes: &[u8]) -> Result<Value>;
}

/// Default structural serializer backed by serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

// == Serialization ==
/// Which serializer the cache uses.
#[derive(Clone, Default)]
pub enum Serialization {
    /// JSON envelope
    #[default]
    Default,
    /// Caller-supplied serializer, still enveloped
    Custom(Arc<dyn Serializer>),
    /// Strings stored verbatim, no envelope
    Disabled,
}

impl fmt::Debug for Serialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Serialization::Default => f.write_str("Default"),
            Serialization::Custom(_) => f.write_str("Custom(..)"),
            Serialization::Disabled => f.write_str("Disabled"),
        }
    }
}

// == Envelope Codec ==
#[derive(Debug, Clone, Default)]
pub struct EnvelopeCodec {
    serialization: Serialization,
}

impl EnvelopeCodec {
    pub fn new(serialization: Serialization) -> Self {
        Self { serialization }
    }

    /// Encodes `value` into the bytes written to disk.
    ///
    /// With serialization disabled only strings can be stored.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        match &self.serialization {
            Serialization::Default => JsonSerializer.serialize(&wrap(value)),
            Serialization::Custom(serializer) => serializer.serialize(&wrap(value)),
            Serialization::Disabled => match value {
                Value::String(s) => Ok(s.clone().into_bytes()),
                other => Err(CacheError::InvalidArgument(format!(
                    "serialization is disabled, only strings can be stored (got {})",
                    kind_of(other)
                ))),
            },
        }
    }

    /// Decodes stored bytes, returning `None` for anything that is not a
    /// well-formed envelope.
    pub fn decode(&self, bytes: &[u8]) -> Option<Value> {
        let decoded = match &self.serialization {
            Serialization::Default => JsonSerializer.deserialize(bytes),
            Serialization::Custom(serializer) => serializer.deserialize(bytes),
            Serialization::Disabled => {
                return String::from_utf8(bytes.to_vec()).ok().map(Value::String);
            }
        };
        match decoded {
            Ok(Value::Array(mut items)) if items.len() == 1 => items.pop(),
            _ => None,
        }
    }
}

fn wrap(value: &Value) -> Value {
    Value::Array(vec![value.clone()])
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
