/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The backing index engine rejected or failed the request.
    #[error("index backend error: {0}")]
    Backend(String),

    #[error("index lock poisoned")]
    LockPoisoned,
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
