use fixity_types::Ref;
use thiserror::Error;

use crate::content::ContentRef;

/// Errors returned by [`crate::Fixity`].
///
/// [`FixityError::NotIndexed`], [`FixityError::PointerNotUpdated`] and
/// [`FixityError::IndexStale`] are returned after the ledger was changed;
/// see [`FixityError::is_durable`]. Every other variant means the ledger and
/// the id pointer were left untouched.
#[derive(Debug, Error)]
pub enum FixityError {
    /// No pointer exists for this id.
    #[error("id not found: {0}")]
    IdNotFound(String),

    #[error("content not found: {0}")]
    ContentNotFound(Ref),

    /// The write is durable (stored, in the ledger, id pointer updated) but
    /// the index notification failed. Retry with [`crate::Fixity::reindex`].
    #[error("content {} written but not indexed: {source}", .content.hash)]
    NotIndexed {
        content: Box<ContentRef>,
        #[source]
        source: fixity_index::IndexError,
    },

    /// The version is stored and appended to the ledger, but the id pointer
    /// still names the previous version. The version is readable through
    /// [`crate::Fixity::read_hash`].
    #[error("content {} written but id pointer not updated: {source}", .content.hash)]
    PointerNotUpdated {
        content: Box<ContentRef>,
        #[source]
        source: fixity_db::DbError,
    },

    /// The delete block is in the ledger, but the index could not drop
    /// `versions`. Calling [`crate::Fixity::delete`] again retries.
    #[error("content deleted but {} versions still indexed: {source}", .versions.len())]
    IndexStale {
        versions: Vec<Ref>,
        #[source]
        source: fixity_index::IndexError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("id lock poisoned")]
    LockPoisoned,

    #[error("store error: {0}")]
    Store(#[from] fixity_store::StoreError),

    #[error("chunk error: {0}")]
    Chunk(#[from] fixity_chunk::ChunkError),

    #[error("ledger error: {0}")]
    Ledger(#[from] fixity_ledger::LedgerError),

    #[error("pointer db error: {0}")]
    Db(#[from] fixity_db::DbError),

    #[error("index error: {0}")]
    Index(#[from] fixity_index::IndexError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FixityError {
    /// `true` when the failed call still changed the ledger.
    pub fn is_durable(&self) -> bool {
        matches!(
            self,
            Self::NotIndexed { .. } | Self::PointerNotUpdated { .. } | Self::IndexStale { .. }
        )
    }
}

pub type FixityResult<T> = Result<T, FixityError>;
