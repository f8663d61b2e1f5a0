use fixity_types::{Field, Ref};

use crate::error::IndexResult;
use crate::query::Query;

/// Searchable metadata over content versions.
///
/// Implementations must be safe for concurrent use and must treat indexing
/// the same `(content, id, fields)` twice, or removing twice, as a no-op.
pub trait Index: Send + Sync {
    /// Record `fields` for the content version `content` written under `id`.
    /// `id` is empty for anonymous writes.
    fn index(&self, content: &Ref, id: &str, fields: &[Field]) -> IndexResult<()>;

    /// Forget the content version `content`. Removing a version that is not
    /// indexed is a no-op.
    fn remove(&self, content: &Ref) -> IndexResult<()>;

    /// Content refs matching every clause of `query`, in ref order.
    fn search(&self, query: &Query) -> IndexResult<Vec<Ref>>;
}
