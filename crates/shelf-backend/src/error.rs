use std::path::PathBuf;

/// Errors from key-value backend operations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// I/O error from the underlying storage medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A persisted document could not be decoded.
    #[error("corrupt store at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// A lock guarding backend state was poisoned by a panicking writer.
    #[error("backend lock poisoned")]
    LockPoisoned,

    /// The backend refused the operation.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
