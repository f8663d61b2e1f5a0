use std::collections::BTreeMap;
use std::sync::RwLock;

use fixity_types::Ref;

use crate::error::{DbError, DbResult};
use crate::traits::PointerStore;

/// An in-memory implementation of [`PointerStore`].
///
/// Data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryPointerStore {
    ids: RwLock<BTreeMap<String, Ref>>,
    head: RwLock<Option<Ref>>,
}

impl InMemoryPointerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PointerStore for InMemoryPointerStore {
    fn get_id_hash(&self, id: &str) -> DbResult<Option<Ref>> {
        let ids = self.ids.read().map_err(|_| DbError::LockPoisoned)?;
        Ok(ids.get(id).copied())
    }

    fn set_id_hash(&self, id: &str, content: &Ref) -> DbResult<()> {
        let mut ids = self.ids.write().map_err(|_| DbError::LockPoisoned)?;
        ids.insert(id.to_string(), *content);
        Ok(())
    }

    fn ledger_head(&self) -> DbResult<Option<Ref>> {
        let head = self.head.read().map_err(|_| DbError::LockPoisoned)?;
        Ok(*head)
    }

    fn set_ledger_head(&self, block: &Ref) -> DbResult<()> {
        let mut head = self.head.write().map_err(|_| DbError::LockPoisoned)?;
        *head = Some(*block);
        Ok(())
    }

    fn ids(&self) -> DbResult<Vec<String>> {
        let ids = self.ids.read().map_err(|_| DbError::LockPoisoned)?;
        Ok(ids.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_store_is_empty() {
        let db = InMemoryPointerStore::new();
        assert_eq!(db.get_id_hash("doc1").unwrap(), None);
        assert_eq!(db.ledger_head().unwrap(), None);
        assert!(db.ids().unwrap().is_empty());
    }

    #[test]
    fn last_write_wins() {
        let db = InMemoryPointerStore::new();
        let a = Ref::from_bytes(b"a");
        let b = Ref::from_bytes(b"b");
        db.set_id_hash("doc1", &a).unwrap();
        db.set_id_hash("doc1", &b).unwrap();
        assert_eq!(db.get_id_hash("doc1").unwrap(), Some(b));

        db.set_ledger_head(&a).unwrap();
        db.set_ledger_head(&b).unwrap();
        assert_eq!(db.ledger_head().unwrap(), Some(b));
    }

    #[test]
    fn ids_are_sorted() {
        let db = InMemoryPointerStore::new();
        let r = Ref::from_bytes(b"r");
        for id in ["zeta", "alpha", "mid"] {
            db.set_id_hash(id, &r).unwrap();
        }
        assert_eq!(db.ids().unwrap(), vec!["alpha", "mid", "zeta"]);
    }
}
