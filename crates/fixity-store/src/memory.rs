use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use fixity_types::Ref;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::ObjectStore;

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. All objects are held in memory behind a
/// `RwLock`. The store counts physical inserts so tests can observe that
/// rewriting an existing object does not store it twice.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<Ref, StoredObject>>,
    physical_writes: AtomicU64,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            physical_writes: AtomicU64::new(0),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of writes that actually inserted a new object.
    pub fn physical_writes(&self) -> u64 {
        self.physical_writes.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &Ref) -> StoreResult<Option<StoredObject>> {
        let map = self.objects.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.get(id).cloned())
    }

    fn write(&self, object: &StoredObject) -> StoreResult<Ref> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        let mut map = self.objects.write().map_err(|_| StoreError::LockPoisoned)?;
        if !map.contains_key(&id) {
            map.insert(id, object.clone());
            self.physical_writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(id)
    }

    fn exists(&self, id: &Ref) -> StoreResult<bool> {
        let map = self.objects.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.contains_key(id))
    }

    fn list(&self) -> StoreResult<Box<dyn Iterator<Item = StoreResult<Ref>> + '_>> {
        let ids: Vec<Ref> = {
            let map = self.objects.read().map_err(|_| StoreError::LockPoisoned)?;
            map.keys().copied().collect()
        };
        Ok(Box::new(ids.into_iter().map(Ok)))
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .field("physical_writes", &self.physical_writes())
            .finish()
    }
}
