use fixity_types::Ref;

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The ledger has no blocks yet. Expected on a fresh store.
    #[error("ledger is empty")]
    EmptyChain,

    #[error("block not found: {0}")]
    BlockNotFound(Ref),

    #[error("store error: {0}")]
    Store(#[from] fixity_store::StoreError),

    #[error("pointer db error: {0}")]
    Db(#[from] fixity_db::DbError),

    #[error("ledger lock poisoned")]
    LockPoisoned,
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
