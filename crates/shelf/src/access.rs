//! Kind-dispatched reads and writes against a backend.
//!
//! An [`Accessor`] is chosen once per key from its declared [`Kind`] and
//! decides which backend slot the key is read from and written to. Keys
//! outside the schema use the string accessor.

use serde_json::{Number, Value};
use shelf_backend::{KvBackend, Primitive};
use shelf_schema::Kind;

use crate::error::{StoreError, StoreResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Accessor(Kind);

impl Accessor {
    pub(crate) fn for_kind(kind: Option<Kind>) -> Self {
        Self(kind.unwrap_or(Kind::String))
    }

    pub(crate) fn kind(&self) -> Kind {
        self.0
    }

    /// Read the raw value for `key` from this accessor's slot.
    ///
    /// `None` means the backend reported its missing sentinel. An empty
    /// structured text reads as `None`; an empty string is returned as-is
    /// and only dropped by [`resolve`].
    pub(crate) fn read<B>(&self, backend: &B, key: &str) -> StoreResult<Option<Value>>
    where
        B: KvBackend + ?Sized,
    {
        let value = match self.0 {
            Kind::String => backend.get_string(key)?.map(Value::String),
            Kind::Boolean => backend.get_bool(key)?.map(Value::Bool),
            Kind::Number => backend.get_number(key)?.and_then(number_value),
            Kind::Structured => match backend.get_string(key)? {
                Some(text) if !text.is_empty() => Some(decode(key, &text)?),
                _ => None,
            },
        };
        Ok(value)
    }

    /// Write `value` through this accessor's slot. `Null` deletes.
    ///
    /// The primitive accessors only take values of their own type; the
    /// structured accessor JSON-encodes anything.
    pub(crate) fn write<B>(&self, backend: &B, key: &str, value: Value) -> StoreResult<()>
    where
        B: KvBackend + ?Sized,
    {
        let primitive = match (self.0, value) {
            (_, Value::Null) => {
                backend.delete(key)?;
                return Ok(());
            }
            (Kind::String, Value::String(s)) => Primitive::String(s),
            (Kind::Boolean, Value::Bool(b)) => Primitive::Bool(b),
            (Kind::Number, Value::Number(n)) => Primitive::Number(number_f64(key, &n)?),
            (Kind::Structured, other) => Primitive::String(encode(key, &other)?),
            (kind, _) => {
                return Err(StoreError::KindMismatch {
                    key: key.to_string(),
                    kind,
                })
            }
        };
        backend.set(key, primitive)?;
        Ok(())
    }
}

/// Apply default fallback to a raw value.
///
/// String keys treat an empty string like a missing value; every other
/// kind falls back only when nothing was read.
pub(crate) fn resolve(kind: Kind, raw: Option<Value>, default: &Value) -> Value {
    match (kind, raw) {
        (Kind::String, Some(Value::String(s))) if s.is_empty() => default.clone(),
        (_, Some(value)) => value,
        (_, None) => default.clone(),
    }
}

/// Write `value` to the slot matching its own runtime type.
///
/// Arrays and objects are stored as JSON text. `Null` deletes.
pub(crate) fn write_loose<B>(backend: &B, key: &str, value: Value) -> StoreResult<()>
where
    B: KvBackend + ?Sized,
{
    let primitive = match value {
        Value::Null => {
            backend.delete(key)?;
            return Ok(());
        }
        Value::String(s) => Primitive::String(s),
        Value::Bool(b) => Primitive::Bool(b),
        Value::Number(n) => Primitive::Number(number_f64(key, &n)?),
        composite => Primitive::String(encode(key, &composite)?),
    };
    backend.set(key, primitive)?;
    Ok(())
}

/// Convert a backend number to JSON, keeping integral values integral so
/// that a stored `5` reads back as `5` rather than `5.0`.
pub(crate) fn number_value(n: f64) -> Option<Value> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        return Some(Value::Number(Number::from(n as i64)));
    }
    Number::from_f64(n).map(Value::Number)
}

fn number_f64(key: &str, n: &Number) -> StoreResult<f64> {
    n.as_f64().ok_or_else(|| StoreError::Encode {
        key: key.to_string(),
        reason: format!("{n} is not representable as a double"),
    })
}

fn encode(key: &str, value: &Value) -> StoreResult<String> {
    serde_json::to_string(value).map_err(|e| StoreError::Encode {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn decode(key: &str, text: &str) -> StoreResult<Value> {
    serde_json::from_str(text).map_err(|e| StoreError::Decode {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
