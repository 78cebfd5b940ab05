//! Value codec used for key and value payloads inside data records.
//!
//! The record stream treats payload bytes as opaque; the codec owns both the
//! encoding and the mapping between values and the type names written into
//! type-hint records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Write};

/// Upper bound on a single encoded payload, guards against corrupt length prefixes.
const MAX_PAYLOAD_LEN: u32 = 64 * 1024 * 1024;

/// A key or value held by a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Text(_) => ValueKind::Text,
            Value::Bytes(_) => ValueKind::Bytes,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{:?}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

/// Kind of a [`Value`], resolved from a type hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Text,
    Bytes,
}

impl ValueKind {
    /// All kinds, in declaration order.
    pub const ALL: [ValueKind; 4] = [
        ValueKind::Bool,
        ValueKind::Int,
        ValueKind::Text,
        ValueKind::Bytes,
    ];

    /// Fully qualified Rust type name carried in type hints.
    pub fn type_name(self) -> &'static str {
        match self {
            ValueKind::Bool => std::any::type_name::<bool>(),
            ValueKind::Int => std::any::type_name::<i64>(),
            ValueKind::Text => std::any::type_name::<String>(),
            ValueKind::Bytes => std::any::type_name::<Vec<u8>>(),
        }
    }
}

/// Codec failures.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("payload of {0} bytes exceeds limit")]
    TooLarge(u32),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Encodes keys and values into data records and names their types.
pub trait ValueCodec: Send + Sync + fmt::Debug {
    /// Type name written into a hint record for this value.
    fn type_name(&self, value: &Value) -> String;

    /// Resolve a hinted type name. `None` if this process cannot decode it.
    fn resolve(&self, type_name: &str) -> Option<ValueKind>;

    /// Write one value.
    fn encode(&self, value: &Value, out: &mut dyn Write) -> Result<(), CodecError>;

    /// Read one value. `expected` is the resolved hint, if the stream had one.
    fn decode(&self, expected: Option<ValueKind>, input: &mut dyn Read) -> Result<Value, CodecError>;
}

/// Length-prefixed bincode payloads.
///
/// ```text
/// ┌──────────────┬──────────────────────────┐
/// │ LEN: u32 LE  │ bincode(Value) [LEN]     │
/// └──────────────┴──────────────────────────┘
/// ```
#[derive(Debug, Clone, Default)]
pub struct BincodeCodec;

impl BincodeCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ValueCodec for BincodeCodec {
    fn type_name(&self, value: &Value) -> String {
        value.kind().type_name().to_string()
    }

    fn resolve(&self, type_name: &str) -> Option<ValueKind> {
        ValueKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.type_name() == type_name)
    }

    fn encode(&self, value: &Value, out: &mut dyn Write) -> Result<(), CodecError> {
        let payload = bincode::serialize(value).map_err(|e| CodecError::Encode(e.to_string()))?;
        let len = u32::try_from(payload.len()).map_err(|_| CodecError::TooLarge(u32::MAX))?;
        if len > MAX_PAYLOAD_LEN {
            return Err(CodecError::TooLarge(len));
        }

        out.write_all(&len.to_le_bytes())?;
        out.write_all(&payload)?;
        Ok(())
    }

    fn decode(&self, expected: Option<ValueKind>, input: &mut dyn Read) -> Result<Value, CodecError> {
        let mut len_buf = [0u8; 4];
        input.read_exact(&mut len_buf)?;
        let len = u32::from_le_bytes(len_buf);
        if len > MAX_PAYLOAD_LEN {
            return Err(CodecError::TooLarge(len));
        }

        let mut payload = vec![0u8; len as usize];
        input.read_exact(&mut payload)?;
        let value: Value =
            bincode::deserialize(&payload).map_err(|e| CodecError::Decode(e.to_string()))?;

        // Hints describe the first record only; later records may differ.
        if let Some(kind) = expected {
            if value.kind() != kind {
                tracing::trace!(
                    expected = kind.type_name(),
                    actual = value.kind().type_name(),
                    "Value differs from hinted type"
                );
            }
        }

        Ok(value)
    }
}
