use thiserror::Error;

/// Errors from the local pointer database.
#[derive(Debug, Error)]
pub enum DbError {
    /// Reading or writing the pointer log failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A pointer update could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The pointer log holds a damaged frame that is followed by intact
    /// frames. The file is left as is; it needs manual repair.
    #[error("pointer log corrupt at byte {offset}")]
    CorruptLog { offset: u64 },

    /// A failed append could not be rolled back, so the log tail is in an
    /// unknown state. No further updates are accepted.
    #[error("pointer log unwritable after a failed append")]
    LogBroken,

    /// A lock guarding the pointer table was poisoned by a panicking thread.
    #[error("pointer store lock poisoned")]
    LockPoisoned,
}

/// Result alias for pointer database operations.
pub type DbResult<T> = Result<T, DbError>;
