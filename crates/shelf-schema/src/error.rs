use thiserror::Error;

use crate::kind::Kind;

/// Errors produced while building, loading or decoding schema data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("default for `{key}` is {found}, expected {kind}")]
    DefaultKindMismatch {
        key: String,
        kind: Kind,
        found: &'static str,
    },

    #[error("version of `{key}` must be text or a finite number, got {version}")]
    InvalidVersion { key: String, version: String },

    #[error("key `{0}` is reserved for store metadata")]
    ReservedKey(String),

    #[error("key `{0}` declared twice")]
    DuplicateKey(String),

    #[error("schema keys must not be empty")]
    EmptyKey,

    #[error("parse error: {0}")]
    Parse(String),
}
