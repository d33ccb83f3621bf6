use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque version token attached to a schema key.
///
/// Tokens only match within the same variant: text `"1"` never matches
/// number `1`. Numeric tokens compare by value, so `2` matches `2.0`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaVersion {
    Number(f64),
    Text(String),
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<&str> for SchemaVersion {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SchemaVersion {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i32> for SchemaVersion {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for SchemaVersion {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i64> for SchemaVersion {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<f64> for SchemaVersion {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}
