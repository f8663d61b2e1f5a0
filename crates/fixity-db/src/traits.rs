use fixity_types::Ref;

use crate::error::DbResult;

/// Mutable pointers kept beside the immutable object store.
///
/// Implementations must be safe to share between threads. Callers serialize
/// updates to the same key themselves (per-id locks and the ledger lock), so
/// a store only has to make each individual `set_*` atomic.
pub trait PointerStore: Send + Sync {
    /// The latest content ref recorded for `id`, if any.
    fn get_id_hash(&self, id: &str) -> DbResult<Option<Ref>>;

    /// Point `id` at `content`.
    fn set_id_hash(&self, id: &str, content: &Ref) -> DbResult<()>;

    /// The newest block ref, or `None` for an empty ledger.
    fn ledger_head(&self) -> DbResult<Option<Ref>>;

    /// Advance the ledger head to `block`.
    fn set_ledger_head(&self, block: &Ref) -> DbResult<()>;

    /// Every id that currently has a pointer, sorted.
    fn ids(&self) -> DbResult<Vec<String>>;
}
