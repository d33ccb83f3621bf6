use shelf_backend::BackendError;
use shelf_schema::{Kind, SchemaError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("key `{0}` is not declared in the schema")]
    UnknownKey(String),

    #[error("value for `{key}` does not fit the {kind} slot")]
    KindMismatch { key: String, kind: Kind },

    #[error("stored value for `{key}` is not valid JSON: {reason}")]
    Decode { key: String, reason: String },

    #[error("failed to encode value for `{key}`: {reason}")]
    Encode { key: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;
