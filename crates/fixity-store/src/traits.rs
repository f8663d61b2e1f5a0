use fixity_types::Ref;

use crate::error::{StoreError, StoreResult};
use crate::object::{Record, StoredObject};

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written: the same data always produces the
///   same ref, and writing it again is a successful no-op.
/// - Concurrent use from many threads is safe.
/// - The store never interprets object contents.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Read an object by its ref.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    /// Returns `Err` on I/O failure or data corruption.
    fn read(&self, id: &Ref) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its ref.
    ///
    /// If the object already exists, this is a no-op (idempotent).
    fn write(&self, object: &StoredObject) -> StoreResult<Ref>;

    /// Check whether an object exists in the store.
    fn exists(&self, id: &Ref) -> StoreResult<bool>;

    /// Lazily list the refs of every stored object.
    ///
    /// Best-effort: objects written while the iterator is live may or may not
    /// appear.
    fn list(&self) -> StoreResult<Box<dyn Iterator<Item = StoreResult<Ref>> + '_>>;

    /// Write an object under a ref the caller already knows.
    ///
    /// Fails with [`StoreError::HashMismatch`], storing nothing, when the
    /// object does not hash to `id`.
    fn write_at(&self, id: &Ref, object: &StoredObject) -> StoreResult<()> {
        let computed = object.compute_id();
        if computed != *id {
            return Err(StoreError::HashMismatch {
                expected: *id,
                computed,
            });
        }
        self.write(object).map(|_| ())
    }

    /// Read an object that must exist.
    fn fetch(&self, id: &Ref) -> StoreResult<StoredObject> {
        self.read(id)?.ok_or(StoreError::NotFound(*id))
    }
}

/// Typed record access on top of any [`ObjectStore`].
pub trait RecordStoreExt: ObjectStore {
    /// Encode and write a record, returning its ref.
    fn put_record<R: Record>(&self, record: &R) -> StoreResult<Ref> {
        self.write(&record.to_stored_object()?)
    }

    /// Fetch and decode a record that must exist.
    fn get_record<R: Record>(&self, id: &Ref) -> StoreResult<R> {
        R::from_stored_object(&self.fetch(id)?)
    }
}

impl<S: ObjectStore + ?Sized> RecordStoreExt for S {}
