use fixity_store::{ObjectKind, ObjectStore, Record};
use fixity_types::{Field, Ref};
use serde::{Deserialize, Serialize};

use crate::error::{FixityError, FixityResult};

/// One version of an id's data.
///
/// Following `previous` backward walks the id's full history, newest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Logical name; empty for anonymous writes.
    pub id: String,
    pub previous: Option<Ref>,
    pub blob: Ref,
    pub fields: Vec<Field>,
}

impl Record for Content {
    const KIND: ObjectKind = ObjectKind::Content;
}

/// A content record together with the ref it is stored under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentRef {
    pub hash: Ref,
    pub content: Content,
}

pub(crate) fn load(store: &dyn ObjectStore, hash: &Ref) -> FixityResult<Content> {
    let object = store
        .read(hash)?
        .ok_or(FixityError::ContentNotFound(*hash))?;
    Ok(Content::from_stored_object(&object)?)
}

/// Lazy walk of a version chain, newest first.
pub struct History<'a> {
    store: &'a dyn ObjectStore,
    next: Option<Ref>,
}

impl<'a> History<'a> {
    pub(crate) fn new(store: &'a dyn ObjectStore, start: Option<Ref>) -> Self {
        Self { store, next: start }
    }
}

impl Iterator for History<'_> {
    type Item = FixityResult<ContentRef>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.next.take()?;
        match load(self.store, &hash) {
            Ok(content) => {
                self.next = content.previous;
                Some(Ok(ContentRef { hash, content }))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixity_store::{InMemoryObjectStore, RecordStoreExt};

    fn version(previous: Option<Ref>, n: u8) -> Content {
        Content {
            id: "doc1".into(),
            previous,
            blob: Ref::from_bytes(&[n]),
            fields: vec![Field::new("rev", n.to_string()).unwrap()],
        }
    }

    #[test]
    fn history_walks_newest_first() {
        let store = InMemoryObjectStore::new();
        let v1 = store.put_record(&version(None, 1)).unwrap();
        let v2 = store.put_record(&version(Some(v1), 2)).unwrap();
        let v3 = store.put_record(&version(Some(v2), 3)).unwrap();

        let hashes: Vec<Ref> = History::new(&store, Some(v3))
            .map(|c| c.unwrap().hash)
            .collect();
        assert_eq!(hashes, vec![v3, v2, v1]);
    }

    #[test]
    fn history_of_nothing_is_empty() {
        let store = InMemoryObjectStore::new();
        assert_eq!(History::new(&store, None).count(), 0);
    }

    #[test]
    fn broken_link_ends_with_error() {
        let store = InMemoryObjectStore::new();
        let missing = Ref::from_bytes(b"gone");
        let v2 = store.put_record(&version(Some(missing), 2)).unwrap();

        let mut history = History::new(&store, Some(v2));
        assert!(history.next().unwrap().is_ok());
        assert!(matches!(
            history.next(),
            Some(Err(FixityError::ContentNotFound(r))) if r == missing
        ));
        assert!(history.next().is_none());
    }

    #[test]
    fn wrong_kind_is_corrupt() {
        let store = InMemoryObjectStore::new();
        let chunk = store
            .write(&fixity_store::StoredObject::new(ObjectKind::Chunk, b"raw".to_vec()))
            .unwrap();
        assert!(matches!(load(&store, &chunk), Err(FixityError::Store(_))));
    }
}
