use fixity_types::Ref;

/// Errors from chunking, blob assembly, and blob reading.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// The requested average chunk size cannot produce valid parameters.
    #[error("invalid average chunk size {0}")]
    InvalidAverageChunkSize(u64),

    /// A chunk named by a blob is absent from the store.
    #[error("chunk not found: {0}")]
    ChunkNotFound(Ref),

    /// A ref named by a blob resolved to a record of another kind.
    #[error("object {0} is not a chunk")]
    NotAChunk(Ref),

    /// Reading the input stream failed.
    #[error("read error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisting or fetching a record failed.
    #[error("store error: {0}")]
    Store(#[from] fixity_store::StoreError),
}

impl ChunkError {
    /// Recover the chunk error wrapped inside an `io::Error` produced by
    /// [`crate::BlobReader`].
    pub fn from_io(err: &std::io::Error) -> Option<&ChunkError> {
        err.get_ref().and_then(|inner| inner.downcast_ref::<ChunkError>())
    }
}

/// Result alias for chunk operations.
pub type ChunkResult<T> = Result<T, ChunkError>;
