use fixity_types::Ref;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(Ref),

    /// Bytes do not hash to the ref they were written or stored under.
    #[error("hash mismatch: expected {expected}, computed {computed}")]
    HashMismatch { expected: Ref, computed: Ref },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The object data is malformed or cannot be decoded.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: Ref, reason: String },

    /// Attempted to write under the null ref.
    #[error("cannot store object with null ref")]
    NullObjectId,

    /// An internal lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
