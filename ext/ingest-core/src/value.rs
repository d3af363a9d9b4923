use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ConvertError;

/// An untyped value taken from one field of an incoming record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeValue {
    // Numeric types
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(OrderedFloat<f32>),
    Float64(OrderedFloat<f64>),
    Number(Arc<str>), // Decimal token kept as text, e.g. a JSON number

    // Basic types
    Boolean(bool),
    String(Arc<str>),
    Bytes(Bytes),

    Timestamp(DateTime<FixedOffset>),

    // Structured types
    Array(Vec<RuntimeValue>),
    Object(IndexMap<Arc<str>, RuntimeValue>), // Preserves source key order

    Null,
}

impl std::hash::Hash for RuntimeValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            RuntimeValue::Int8(i) => i.hash(state),
            RuntimeValue::Int16(i) => i.hash(state),
            RuntimeValue::Int32(i) => i.hash(state),
            RuntimeValue::Int64(i) => i.hash(state),
            RuntimeValue::UInt8(i) => i.hash(state),
            RuntimeValue::UInt16(i) => i.hash(state),
            RuntimeValue::UInt32(i) => i.hash(state),
            RuntimeValue::UInt64(i) => i.hash(state),
            RuntimeValue::Float32(f) => f.hash(state),
            RuntimeValue::Float64(f) => f.hash(state),
            RuntimeValue::Number(n) => n.hash(state),
            RuntimeValue::Boolean(b) => b.hash(state),
            RuntimeValue::String(s) => s.hash(state),
            RuntimeValue::Bytes(b) => b.hash(state),
            RuntimeValue::Timestamp(t) => t.hash(state),
            RuntimeValue::Array(items) => items.hash(state),
            RuntimeValue::Object(fields) => {
                for (k, v) in fields {
                    k.hash(state);
                    v.hash(state);
                }
            }
            RuntimeValue::Null => 0_i32.hash(state),
        }
    }
}

impl RuntimeValue {
    /// Check if the value is absent
    pub fn is_null(&self) -> bool {
        matches!(self, RuntimeValue::Null)
    }

    /// Get the type name of the value
    pub fn type_name(&self) -> &'static str {
        match self {
            RuntimeValue::Int8(_) => "Int8",
            RuntimeValue::Int16(_) => "Int16",
            RuntimeValue::Int32(_) => "Int32",
            RuntimeValue::Int64(_) => "Int64",
            RuntimeValue::UInt8(_) => "UInt8",
            RuntimeValue::UInt16(_) => "UInt16",
            RuntimeValue::UInt32(_) => "UInt32",
            RuntimeValue::UInt64(_) => "UInt64",
            RuntimeValue::Float32(_) => "Float32",
            RuntimeValue::Float64(_) => "Float64",
            RuntimeValue::Number(_) => "Number",
            RuntimeValue::Boolean(_) => "Boolean",
            RuntimeValue::String(_) => "String",
            RuntimeValue::Bytes(_) => "Bytes",
            RuntimeValue::Timestamp(_) => "Timestamp",
            RuntimeValue::Array(_) => "Array",
            RuntimeValue::Object(_) => "Object",
            RuntimeValue::Null => "Null",
        }
    }

    /// Build a JSON document for this value.
    ///
    /// Object keys end up sorted because `serde_json::Map` is ordered by key.
    pub fn to_json_value(&self) -> Result<serde_json::Value, ConvertError> {
        use serde_json::{Number, Value};

        Ok(match self {
            RuntimeValue::Null => Value::Null,
            RuntimeValue::Boolean(b) => Value::Bool(*b),
            RuntimeValue::Int8(i) => Value::from(*i),
            RuntimeValue::Int16(i) => Value::from(*i),
            RuntimeValue::Int32(i) => Value::from(*i),
            RuntimeValue::Int64(i) => Value::from(*i),
            RuntimeValue::UInt8(i) => Value::from(*i),
            RuntimeValue::UInt16(i) => Value::from(*i),
            RuntimeValue::UInt32(i) => Value::from(*i),
            RuntimeValue::UInt64(i) => Value::from(*i),
            RuntimeValue::Float32(f) => {
                if !f.is_finite() {
                    return Err(ConvertError::InvalidFloat {
                        value: f.to_string(),
                    });
                }
                // Shortest f32 text, not the widened f64 digits
                Value::Number(Number::from_str(&f.to_string())?)
            }
            RuntimeValue::Float64(f) => Number::from_f64(f.0).map(Value::Number).ok_or_else(|| {
                ConvertError::InvalidFloat {
                    value: f.to_string(),
                }
            })?,
            RuntimeValue::Number(n) => Value::Number(Number::from_str(n.trim())?),
            RuntimeValue::String(s) => Value::String(s.to_string()),
            RuntimeValue::Bytes(b) => {
                Value::String(base64::engine::general_purpose::STANDARD.encode(b))
            }
            RuntimeValue::Timestamp(t) => {
                Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            RuntimeValue::Array(items) => Value::Array(
                items
                    .iter()
                    .map(RuntimeValue::to_json_value)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            RuntimeValue::Object(fields) => {
                let mut map = serde_json::Map::new();
                for (k, v) in fields {
                    map.insert(k.to_string(), v.to_json_value()?);
                }
                Value::Object(map)
            }
        })
    }

    /// Compact JSON with sorted object keys.
    pub fn to_canonical_json(&self) -> Result<Vec<u8>, ConvertError> {
        Ok(serde_json::to_vec(&self.to_json_value()?)?)
    }
}

impl From<serde_json::Value> for RuntimeValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => RuntimeValue::Null,
            Value::Bool(b) => RuntimeValue::Boolean(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    RuntimeValue::Int64(i)
                } else if let Some(u) = n.as_u64() {
                    RuntimeValue::UInt64(u)
                } else {
                    RuntimeValue::Number(Arc::from(n.to_string()))
                }
            }
            Value::String(s) => RuntimeValue::String(Arc::from(s)),
            Value::Array(items) => {
                RuntimeValue::Array(items.into_iter().map(RuntimeValue::from).collect())
            }
            Value::Object(fields) => RuntimeValue::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (Arc::from(k), RuntimeValue::from(v)))
                    .collect(),
            ),
        }
    }
}

macro_rules! impl_from_native {
    ($($native:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$native> for RuntimeValue {
                fn from(v: $native) -> Self {
                    RuntimeValue::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_native!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    bool => Boolean,
    &str => String,
    String => String,
    Bytes => Bytes,
    Vec<u8> => Bytes,
    DateTime<FixedOffset> => Timestamp,
);

impl From<DateTime<Utc>> for RuntimeValue {
    fn from(t: DateTime<Utc>) -> Self {
        RuntimeValue::Timestamp(t.fixed_offset())
    }
}

impl<T: Into<RuntimeValue>> From<Option<T>> for RuntimeValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(RuntimeValue::Null, Into::into)
    }
}
