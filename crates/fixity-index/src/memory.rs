use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use fixity_types::{Field, Ref};
use tracing::debug;

use crate::error::{IndexError, IndexResult};
use crate::query::Query;
use crate::traits::Index;

#[derive(Debug, Default)]
struct Postings {
    by_field: BTreeMap<Field, BTreeSet<Ref>>,
    by_id: BTreeMap<String, BTreeSet<Ref>>,
    /// What each indexed version was posted under, so it can be taken out.
    entries: BTreeMap<Ref, Entry>,
}

#[derive(Debug, Default)]
struct Entry {
    ids: BTreeSet<String>,
    fields: BTreeSet<Field>,
}

/// Drop `content` from the set at `key`, and the set itself once empty.
fn unpost<K: Ord>(map: &mut BTreeMap<K, BTreeSet<Ref>>, key: &K, content: &Ref) {
    if let Some(set) = map.get_mut(key) {
        set.remove(content);
        if set.is_empty() {
            map.remove(key);
        }
    }
}

/// An in-memory [`Index`] keeping one posting set per exact field value.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    postings: RwLock<Postings>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct content versions indexed.
    pub fn len(&self) -> usize {
        self.postings.read().map(|p| p.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Index for InMemoryIndex {
    fn index(&self, content: &Ref, id: &str, fields: &[Field]) -> IndexResult<()> {
        let mut postings = self.postings.write().map_err(|_| IndexError::LockPoisoned)?;
        let postings = &mut *postings;
        let entry = postings.entries.entry(*content).or_default();
        if !id.is_empty() {
            entry.ids.insert(id.to_string());
            postings.by_id.entry(id.to_string()).or_default().insert(*content);
        }
        for field in fields {
            entry.fields.insert(field.clone());
            postings.by_field.entry(field.clone()).or_default().insert(*content);
        }
        debug!(%content, id, fields = fields.len(), "indexed content");
        Ok(())
    }

    fn remove(&self, content: &Ref) -> IndexResult<()> {
        let mut postings = self.postings.write().map_err(|_| IndexError::LockPoisoned)?;
        let Some(entry) = postings.entries.remove(content) else {
            return Ok(());
        };
        for id in &entry.ids {
            unpost(&mut postings.by_id, id, content);
        }
        for field in &entry.fields {
            unpost(&mut postings.by_field, field, content);
        }
        debug!(%content, "removed content from index");
        Ok(())
    }

    fn search(&self, query: &Query) -> IndexResult<Vec<Ref>> {
        let postings = self.postings.read().map_err(|_| IndexError::LockPoisoned)?;

        let mut sets: Vec<&BTreeSet<Ref>> = Vec::with_capacity(query.fields.len() + 1);
        if let Some(id) = &query.id {
            match postings.by_id.get(id) {
                Some(set) => sets.push(set),
                None => return Ok(Vec::new()),
            }
        }
        for field in &query.fields {
            match postings.by_field.get(field) {
                Some(set) => sets.push(set),
                None => return Ok(Vec::new()),
            }
        }

        // Drive the intersection from the smallest posting set.
        sets.sort_by_key(|set| set.len());
        let Some((first, rest)) = sets.split_first() else {
            return Ok(postings.entries.keys().copied().collect());
        };
        Ok(first
            .iter()
            .filter(|content| rest.iter().all(|set| set.contains(*content)))
            .copied()
            .collect())
    }
}
