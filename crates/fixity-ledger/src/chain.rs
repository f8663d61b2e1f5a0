use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use fixity_db::PointerStore;
use fixity_store::{ObjectStore, Record, RecordStoreExt};
use fixity_types::Ref;
use tracing::{debug, info};

use crate::block::{Block, BlockKind, BlockRef};
use crate::error::{LedgerError, LedgerResult};

/// One page of the raw block stream, newest first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockPage {
    pub blocks: Vec<BlockRef>,
    /// Cursor for the following page; `None` once genesis is included.
    pub next: Option<Ref>,
}

/// The append-only ledger.
///
/// Blocks are stored in the object store; the head ref is kept in the
/// pointer store. A single mutex serializes "read head, build next block,
/// write it, advance head", which is what keeps block numbers gap-free under
/// concurrent writers. Readers never take it.
pub struct Blockchain {
    store: Arc<dyn ObjectStore>,
    db: Arc<dyn PointerStore>,
    lock: Mutex<()>,
}

impl Blockchain {
    pub fn new(store: Arc<dyn ObjectStore>, db: Arc<dyn PointerStore>) -> Self {
        Self {
            store,
            db,
            lock: Mutex::new(()),
        }
    }

    pub(crate) fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    /// The newest block.
    pub fn head(&self) -> LedgerResult<BlockRef> {
        let hash = self.db.ledger_head()?.ok_or(LedgerError::EmptyChain)?;
        Ok(BlockRef {
            hash,
            block: self.get(&hash)?,
        })
    }

    /// Ref of the newest block, without loading it.
    pub(crate) fn head_ref(&self) -> LedgerResult<Option<Ref>> {
        Ok(self.db.ledger_head()?)
    }

    /// Number of blocks in the ledger, `0` when empty.
    pub fn height(&self) -> LedgerResult<u64> {
        match self.head() {
            Ok(head) => Ok(head.block.number),
            Err(LedgerError::EmptyChain) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Look a block up by ref. Logically deleted blocks are still returned.
    pub fn get(&self, hash: &Ref) -> LedgerResult<Block> {
        let object = self
            .store
            .read(hash)?
            .ok_or(LedgerError::BlockNotFound(*hash))?;
        Ok(Block::from_stored_object(&object)?)
    }

    /// Append a block announcing `content`.
    pub fn append_content(&self, content: &Ref) -> LedgerResult<BlockRef> {
        let _guard = self.lock.lock().map_err(|_| LedgerError::LockPoisoned)?;
        self.append_locked(BlockKind::Content { hash: *content })
    }

    /// Logically delete every live content block naming one of `contents`.
    ///
    /// Appends one delete block listing the matched block refs, newest
    /// first. Returns `None`, appending nothing, when `contents` is empty or
    /// no live block matches.
    pub fn delete_content(&self, contents: &[Ref]) -> LedgerResult<Option<BlockRef>> {
        if contents.is_empty() {
            return Ok(None);
        }
        let wanted: HashSet<&Ref> = contents.iter().collect();

        // The full walk runs unlocked; blocks appended meanwhile are
        // rechecked under the lock.
        let start = self.db.ledger_head()?;
        let mut matched = Vec::new();
        for entry in Live::new(self, start) {
            let entry = entry?;
            if entry.block.content().is_some_and(|c| wanted.contains(c)) {
                matched.push(entry.hash);
            }
        }

        let _guard = self.lock.lock().map_err(|_| LedgerError::LockPoisoned)?;
        let hashes = self.recheck_locked(start, matched, &wanted)?;
        if hashes.is_empty() {
            debug!(requested = contents.len(), "delete matched no live blocks");
            return Ok(None);
        }
        self.append_locked(BlockKind::Delete { hashes }).map(Some)
    }

    /// Bring `matched`, the live matches found walking from `start`, up to
    /// date with every block appended since. Caller must hold `self.lock`.
    fn recheck_locked(
        &self,
        start: Option<Ref>,
        matched: Vec<Ref>,
        wanted: &HashSet<&Ref>,
    ) -> LedgerResult<Vec<Ref>> {
        let mut found = Vec::new();
        let mut skipped = HashSet::new();
        let mut next = self.db.ledger_head()?;
        while next != start {
            let Some(hash) = next else { break };
            let block = self.get(&hash)?;
            next = block.previous;
            match &block.kind {
                BlockKind::Delete { hashes } => skipped.extend(hashes.iter().copied()),
                BlockKind::Content { hash: content }
                    if wanted.contains(content) && !skipped.contains(&hash) =>
                {
                    found.push(hash)
                }
                BlockKind::Content { .. } => {}
            }
        }
        found.extend(matched.into_iter().filter(|h| !skipped.contains(h)));
        Ok(found)
    }

    /// Caller must hold `self.lock`.
    fn append_locked(&self, kind: BlockKind) -> LedgerResult<BlockRef> {
        let (number, previous) = match self.db.ledger_head()? {
            Some(head) => (self.get(&head)?.number + 1, Some(head)),
            None => (1, None),
        };
        let block = Block {
            number,
            previous,
            kind,
        };
        let hash = self.store.put_record(&block)?;
        self.db.set_ledger_head(&hash)?;

        match &block.kind {
            BlockKind::Content { hash: content } => {
                debug!(number, block = %hash, content = %content, "appended content block")
            }
            BlockKind::Delete { hashes } => {
                info!(number, block = %hash, deleted = hashes.len(), "appended delete block")
            }
        }
        Ok(BlockRef { hash, block })
    }

    /// Every block from head to genesis, delete blocks included.
    pub fn blocks(&self) -> LedgerResult<Blocks<'_>> {
        Ok(Blocks {
            chain: self,
            next: self.db.ledger_head()?,
        })
    }

    /// Content blocks still live, newest first.
    ///
    /// Delete blocks are passed through and their targets remembered; a
    /// content block named by a newer delete is not yielded.
    pub fn live(&self) -> Live<'_> {
        match self.db.ledger_head() {
            Ok(head) => Live::new(self, head),
            Err(e) => Live::failed(self, e.into()),
        }
    }

    /// Skip-aware traversal starting at `start` (inclusive).
    pub fn live_from(&self, start: &Ref) -> Live<'_> {
        Live::new(self, Some(*start))
    }

    /// Up to `limit` raw blocks starting at `cursor`, or at head when
    /// `cursor` is `None`.
    pub fn page(&self, cursor: Option<&Ref>, limit: usize) -> LedgerResult<BlockPage> {
        let start = match cursor {
            Some(cursor) => Some(*cursor),
            None => self.db.ledger_head()?,
        };
        let mut blocks = Vec::with_capacity(limit.min(1024));
        let mut next = start;
        while blocks.len() < limit {
            let Some(hash) = next else { break };
            let block = self.get(&hash)?;
            next = block.previous;
            blocks.push(BlockRef { hash, block });
        }
        Ok(BlockPage { blocks, next })
    }
}

impl std::fmt::Debug for Blockchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blockchain").finish_non_exhaustive()
    }
}

/// Raw traversal from head toward genesis. See [`Blockchain::blocks`].
pub struct Blocks<'a> {
    chain: &'a Blockchain,
    next: Option<Ref>,
}

impl Iterator for Blocks<'_> {
    type Item = LedgerResult<BlockRef>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.next.take()?;
        match self.chain.get(&hash) {
            Ok(block) => {
                self.next = block.previous;
                Some(Ok(BlockRef { hash, block }))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Skip-aware traversal. See [`Blockchain::live`].
pub struct Live<'a> {
    chain: &'a Blockchain,
    next: Option<Ref>,
    skipped: HashSet<Ref>,
    error: Option<LedgerError>,
}

impl<'a> Live<'a> {
    fn new(chain: &'a Blockchain, start: Option<Ref>) -> Self {
        Self {
            chain,
            next: start,
            skipped: HashSet::new(),
            error: None,
        }
    }

    fn failed(chain: &'a Blockchain, error: LedgerError) -> Self {
        Self {
            chain,
            next: None,
            skipped: HashSet::new(),
            error: Some(error),
        }
    }
}

impl Iterator for Live<'_> {
    type Item = LedgerResult<BlockRef>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.error.take() {
            return Some(Err(e));
        }
        while let Some(hash) = self.next.take() {
            let block = match self.chain.get(&hash) {
                Ok(block) => block,
                Err(e) => return Some(Err(e)),
            };
            self.next = block.previous;
            match &block.kind {
                BlockKind::Delete { hashes } => self.skipped.extend(hashes.iter().copied()),
                BlockKind::Content { .. } if self.skipped.contains(&hash) => {}
                BlockKind::Content { .. } => return Some(Ok(BlockRef { hash, block })),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixity_db::InMemoryPointerStore;
    use fixity_store::InMemoryObjectStore;

    fn chain() -> (Arc<InMemoryObjectStore>, Blockchain) {
        let store = Arc::new(InMemoryObjectStore::new());
        let chain = Blockchain::new(store.clone(), Arc::new(InMemoryPointerStore::new()));
        (store, chain)
    }

    fn content(n: u32) -> Ref {
        Ref::from_bytes(format!("content-{n}").as_bytes())
    }

    fn live_contents(chain: &Blockchain) -> Vec<Ref> {
        chain
            .live()
            .map(|b| *b.unwrap().block.content().unwrap())
            .collect()
    }

    #[test]
    fn empty_chain() {
        let (_, chain) = chain();
        assert!(matches!(chain.head(), Err(LedgerError::EmptyChain)));
        assert_eq!(chain.height().unwrap(), 0);
        assert_eq!(chain.live().count(), 0);
        assert_eq!(chain.blocks().unwrap().count(), 0);
    }

    #[test]
    fn appends_link_and_number() {
        let (_, chain) = chain();
        let first = chain.append_content(&content(1)).unwrap();
        let second = chain.append_content(&content(2)).unwrap();

        assert_eq!(first.block.number, 1);
        assert!(first.block.is_genesis());
        assert_eq!(second.block.number, 2);
        assert_eq!(second.block.previous, Some(first.hash));
        assert_eq!(chain.head().unwrap(), second);
        assert_eq!(chain.height().unwrap(), 2);
    }

    #[test]
    fn delete_skips_content_but_keeps_block() {
        let (store, chain) = chain();
        chain.append_content(&content(1)).unwrap();
        let second = chain.append_content(&content(2)).unwrap();
        chain.append_content(&content(3)).unwrap();
        let before = store.fetch(&second.hash).unwrap();

        let delete = chain.delete_content(&[content(2)]).unwrap().unwrap();
        assert_eq!(delete.block.number, 4);
        assert_eq!(
            delete.block.kind,
            BlockKind::Delete {
                hashes: vec![second.hash]
            }
        );

        let numbers: Vec<u64> = chain.blocks().unwrap().map(|b| b.unwrap().block.number).collect();
        assert_eq!(numbers, vec![4, 3, 2, 1]);
        assert_eq!(live_contents(&chain), vec![content(3), content(1)]);

        // Still there by direct lookup, byte for byte.
        assert_eq!(chain.get(&second.hash).unwrap(), second.block);
        assert_eq!(store.fetch(&second.hash).unwrap(), before);
    }

    #[test]
    fn delete_of_unknown_or_nothing_is_noop() {
        let (_, chain) = chain();
        assert!(chain.delete_content(&[]).unwrap().is_none());
        assert!(chain.delete_content(&[content(9)]).unwrap().is_none());

        chain.append_content(&content(1)).unwrap();
        assert!(chain.delete_content(&[content(9)]).unwrap().is_none());
        assert!(chain.delete_content(&[]).unwrap().is_none());
        assert_eq!(chain.height().unwrap(), 1);
    }

    #[test]
    fn already_deleted_content_is_not_deleted_twice() {
        let (_, chain) = chain();
        chain.append_content(&content(1)).unwrap();
        assert!(chain.delete_content(&[content(1)]).unwrap().is_some());
        assert!(chain.delete_content(&[content(1)]).unwrap().is_none());
        assert_eq!(chain.height().unwrap(), 2);
    }

    #[test]
    fn delete_matches_every_block_naming_the_content() {
        let (_, chain) = chain();
        let a = chain.append_content(&content(1)).unwrap();
        chain.append_content(&content(2)).unwrap();
        let b = chain.append_content(&content(1)).unwrap();

        let delete = chain.delete_content(&[content(1)]).unwrap().unwrap();
        assert_eq!(
            delete.block.kind,
            BlockKind::Delete {
                hashes: vec![b.hash, a.hash]
            }
        );
        assert_eq!(live_contents(&chain), vec![content(2)]);
    }

    #[test]
    fn blocks_appended_during_the_match_are_rechecked() {
        let (_, chain) = chain();
        let a = chain.append_content(&content(1)).unwrap();
        let b = chain.append_content(&content(2)).unwrap();
        // What the unlocked walk for contents 1 and 2 found at head `b`.
        let start = Some(b.hash);
        let matched = vec![b.hash, a.hash];

        // Another writer gets in before the lock is taken.
        let c = chain.append_content(&content(1)).unwrap();
        chain.delete_content(&[content(2)]).unwrap();

        let wanted_refs = [content(1), content(2)];
        let wanted: HashSet<&Ref> = wanted_refs.iter().collect();
        let _guard = chain.lock.lock().unwrap();
        let hashes = chain.recheck_locked(start, matched, &wanted).unwrap();
        assert_eq!(hashes, vec![c.hash, a.hash]);
    }

    #[test]
    fn content_appended_after_delete_is_live() {
        let (_, chain) = chain();
        chain.append_content(&content(1)).unwrap();
        chain.delete_content(&[content(1)]).unwrap();
        chain.append_content(&content(1)).unwrap();
        assert_eq!(live_contents(&chain), vec![content(1)]);
    }

    #[test]
    fn live_from_a_middle_block() {
        let (_, chain) = chain();
        chain.append_content(&content(1)).unwrap();
        let second = chain.append_content(&content(2)).unwrap();
        chain.append_content(&content(3)).unwrap();

        let from: Vec<Ref> = chain
            .live_from(&second.hash)
            .map(|b| *b.unwrap().block.content().unwrap())
            .collect();
        assert_eq!(from, vec![content(2), content(1)]);
    }

    #[test]
    fn pages_walk_newest_first() {
        let (_, chain) = chain();
        for n in 1..=5 {
            chain.append_content(&content(n)).unwrap();
        }

        let first = chain.page(None, 2).unwrap();
        let numbers: Vec<u64> = first.blocks.iter().map(|b| b.block.number).collect();
        assert_eq!(numbers, vec![5, 4]);
        let cursor = first.next.unwrap();

        let second = chain.page(Some(&cursor), 2).unwrap();
        assert_eq!(second.blocks[0].hash, cursor);
        let last = chain.page(second.next.as_ref(), 2).unwrap();
        assert_eq!(last.blocks.len(), 1);
        assert_eq!(last.blocks[0].block.number, 1);
        assert!(last.next.is_none());
    }

    #[test]
    fn page_of_empty_chain() {
        let (_, chain) = chain();
        let page = chain.page(None, 10).unwrap();
        assert!(page.blocks.is_empty());
        assert!(page.next.is_none());
    }

    #[test]
    fn missing_block_surfaces_in_traversal() {
        let store = Arc::new(InMemoryObjectStore::new());
        let db = Arc::new(InMemoryPointerStore::new());
        let dangling = Ref::from_bytes(b"dangling");
        db.set_ledger_head(&dangling).unwrap();
        let chain = Blockchain::new(store, db);

        assert!(matches!(chain.head(), Err(LedgerError::BlockNotFound(r)) if r == dangling));
        let mut live = chain.live();
        assert!(matches!(live.next(), Some(Err(LedgerError::BlockNotFound(_)))));
        assert!(live.next().is_none());
    }

    #[test]
    fn concurrent_appends_are_gap_free() {
        use std::thread;

        let (_, chain) = chain();
        let chain = Arc::new(chain);
        let handles: Vec<_> = (0..8u32)
            .map(|t| {
                let chain = Arc::clone(&chain);
                thread::spawn(move || {
                    for n in 0..10u32 {
                        chain.append_content(&content(t * 100 + n)).unwrap();
                        if n % 5 == 4 {
                            chain.delete_content(&[content(t * 100 + n)]).unwrap();
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let mut numbers: Vec<u64> = chain.blocks().unwrap().map(|b| b.unwrap().block.number).collect();
        numbers.reverse();
        let total = 8 * (10 + 2);
        assert_eq!(numbers, (1..=total).collect::<Vec<u64>>());
        assert_eq!(chain.live().count() as u64, 8 * 8);
    }
}
