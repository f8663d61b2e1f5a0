use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use fixity_chunk::{Blob, BlobReader, BlobWriter, ChunkParams};
use fixity_db::{FilePointerStore, InMemoryPointerStore, PointerStore};
use fixity_index::{InMemoryIndex, Index, Query};
use fixity_ledger::{BlockRef, Blockchain};
use fixity_store::{InMemoryObjectStore, LocalObjectStore, ObjectStore, RecordStoreExt};
use fixity_types::{Field, Ref};
use tracing::{debug, info, warn};

use crate::config::FixityConfig;
use crate::content::{self, Content, ContentRef, History};
use crate::error::{FixityError, FixityResult};
use crate::locks::IdLocks;

/// Byte stream over a stored version, fetched chunk by chunk.
pub type ContentReader = BlobReader<dyn ObjectStore>;

/// File name of the pointer log inside a disk-backed root.
const POINTER_LOG: &str = "pointers.log";

/// The write/read/delete entry point.
///
/// A write runs chunker, blob, content record, ledger append, id pointer,
/// index, in that order. The ledger append and the pointer update come
/// last, so any earlier failure leaves only unreferenced objects behind.
///
/// Concurrency: writes and deletes on the same id are serialized by a per-id
/// lock; the ledger serializes its own appends. Reads take no locks.
pub struct Fixity {
    store: Arc<dyn ObjectStore>,
    db: Arc<dyn PointerStore>,
    index: Arc<dyn Index>,
    ledger: Blockchain,
    locks: IdLocks,
    config: FixityConfig,
}

impl Fixity {
    pub fn builder() -> FixityBuilder {
        FixityBuilder::default()
    }

    /// A fully in-memory instance with the default configuration.
    pub fn in_memory() -> Self {
        Self::from_parts(
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryPointerStore::new()),
            Arc::new(InMemoryIndex::new()),
            FixityConfig::default(),
        )
    }

    /// Open a disk-backed instance rooted at `root`.
    ///
    /// Objects go to a [`LocalObjectStore`] under `root`, pointers to a
    /// [`FilePointerStore`] log beside it. The in-memory index is rebuilt
    /// from the live ledger.
    pub fn open(root: impl AsRef<Path>, config: FixityConfig) -> FixityResult<Self> {
        let root = root.as_ref();
        let store = LocalObjectStore::open(root)?;
        let db = FilePointerStore::open(root.join(POINTER_LOG), config.fsync)?;
        let fixity = Self::builder()
            .store(Arc::new(store))
            .pointers(Arc::new(db))
            .index(Arc::new(InMemoryIndex::new()))
            .config(config)
            .build()?;
        let indexed = fixity.rebuild_index()?;
        info!(root = %root.display(), indexed, "opened fixity store");
        Ok(fixity)
    }

    fn from_parts(
        store: Arc<dyn ObjectStore>,
        db: Arc<dyn PointerStore>,
        index: Arc<dyn Index>,
        config: FixityConfig,
    ) -> Self {
        let ledger = Blockchain::new(Arc::clone(&store), Arc::clone(&db));
        Self {
            store,
            db,
            index,
            ledger,
            locks: IdLocks::default(),
            config,
        }
    }

    pub fn config(&self) -> &FixityConfig {
        &self.config
    }

    pub fn blockchain(&self) -> &Blockchain {
        &self.ledger
    }

    /// Store `reader` as the next version of `id`.
    ///
    /// An empty `id` writes anonymous content: it is chunked, stored and
    /// appended to the ledger, but no pointer is kept and no lock is taken.
    ///
    /// `average_chunk_size` overrides the chunk size. Without it the previous
    /// version's size is reused (when configured), else the configured
    /// default.
    ///
    /// Returns [`FixityError::PointerNotUpdated`] when the ledger append
    /// succeeded but the id pointer update did not, and
    /// [`FixityError::NotIndexed`] when only the index notification failed.
    pub fn write<R: Read>(
        &self,
        id: &str,
        fields: Vec<Field>,
        reader: R,
        average_chunk_size: Option<u64>,
    ) -> FixityResult<ContentRef> {
        let lock = if id.is_empty() {
            None
        } else {
            Some(self.locks.for_id(id)?)
        };
        let _guard = match &lock {
            Some(lock) => Some(lock.lock().map_err(|_| FixityError::LockPoisoned)?),
            None => None,
        };

        let previous = if id.is_empty() {
            None
        } else {
            self.db.get_id_hash(id)?
        };
        let average = match average_chunk_size {
            Some(average) => average,
            None => self.inherited_average(previous.as_ref())?,
        };

        let (blob, _) = BlobWriter::new(self.store.as_ref(), average)?.write(reader)?;
        let content = Content {
            id: id.to_string(),
            previous,
            blob,
            fields,
        };
        let hash = self.store.put_record(&content)?;

        let block = self.ledger.append_content(&hash)?;
        let pointer = if id.is_empty() {
            Ok(())
        } else {
            self.db.set_id_hash(id, &hash)
        };
        info!(id, content = %hash, block = block.block.number, average, "wrote content");

        // The version is live in the ledger now, so it is indexed even when
        // the pointer update failed.
        let written = ContentRef { hash, content };
        let indexed = self.index.index(&hash, id, &written.content.fields);
        if let Err(source) = pointer {
            warn!(id, content = %hash, error = %source, "content written but id pointer not updated");
            if let Err(e) = indexed {
                warn!(id, content = %hash, error = %e, "content written but not indexed");
            }
            return Err(FixityError::PointerNotUpdated {
                content: Box::new(written),
                source,
            });
        }
        if let Err(source) = indexed {
            warn!(id, content = %hash, error = %source, "content written but not indexed");
            return Err(FixityError::NotIndexed {
                content: Box::new(written),
                source,
            });
        }
        Ok(written)
    }

    fn inherited_average(&self, previous: Option<&Ref>) -> FixityResult<u64> {
        let default = self.config.default_average_chunk_size;
        let Some(previous) = previous.filter(|_| self.config.inherit_average_chunk_size) else {
            return Ok(default);
        };
        let content = content::load(self.store.as_ref(), previous)?;
        let blob: Blob = self.store.get_record(&content.blob)?;
        debug!(previous = %previous, average = blob.average_chunk_size, "inheriting chunk size");
        Ok(blob.average_chunk_size)
    }

    /// Latest version of `id` and a reader over its bytes.
    pub fn read(&self, id: &str) -> FixityResult<(ContentRef, ContentReader)> {
        let hash = self
            .db
            .get_id_hash(id)?
            .ok_or_else(|| FixityError::IdNotFound(id.to_string()))?;
        self.read_hash(&hash)
    }

    /// The version stored under `hash` and a reader over its bytes.
    pub fn read_hash(&self, hash: &Ref) -> FixityResult<(ContentRef, ContentReader)> {
        let content = content::load(self.store.as_ref(), hash)?;
        let blob: Blob = self.store.get_record(&content.blob)?;
        let reader = BlobReader::new(Arc::clone(&self.store), blob);
        Ok((
            ContentRef {
                hash: *hash,
                content,
            },
            reader,
        ))
    }

    /// Logically delete every version of `id`.
    ///
    /// Appends one delete block naming the ledger blocks of all of `id`'s
    /// versions and removes the versions from the index. Nothing stored is
    /// removed and the id pointer is kept, so [`Fixity::read`] still
    /// resolves; only ledger traversal and search stop yielding the
    /// versions. Returns `None` when nothing was left to delete.
    ///
    /// Returns [`FixityError::IndexStale`] when the delete block was
    /// appended but the index could not be updated.
    pub fn delete(&self, id: &str) -> FixityResult<Option<BlockRef>> {
        let lock = self.locks.for_id(id)?;
        let _guard = lock.lock().map_err(|_| FixityError::LockPoisoned)?;

        let head = self
            .db
            .get_id_hash(id)?
            .ok_or_else(|| FixityError::IdNotFound(id.to_string()))?;
        let versions = History::new(self.store.as_ref(), Some(head))
            .map(|version| version.map(|v| v.hash))
            .collect::<FixityResult<Vec<Ref>>>()?;

        let block = self.ledger.delete_content(&versions)?;
        match &block {
            Some(block) => info!(id, versions = versions.len(), block = block.block.number, "deleted content"),
            None => debug!(id, "nothing left to delete"),
        }

        // Always run, so a retry clears what an earlier failure left behind.
        let failed = versions
            .iter()
            .find_map(|version| self.index.remove(version).err().map(|e| (*version, e)));
        if let Some((version, source)) = failed {
            warn!(id, content = %version, error = %source, "content deleted but still indexed");
            return Err(FixityError::IndexStale { versions, source });
        }
        Ok(block)
    }

    /// Versions reachable from `hash`, newest first.
    pub fn history(&self, hash: &Ref) -> History<'_> {
        History::new(self.store.as_ref(), Some(*hash))
    }

    /// Versions of `id`, newest first.
    pub fn history_of(&self, id: &str) -> FixityResult<History<'_>> {
        let head = self
            .db
            .get_id_hash(id)?
            .ok_or_else(|| FixityError::IdNotFound(id.to_string()))?;
        Ok(self.history(&head))
    }

    /// Hand a stored version to the index again.
    pub fn reindex(&self, hash: &Ref) -> FixityResult<()> {
        let content = content::load(self.store.as_ref(), hash)?;
        self.index.index(hash, &content.id, &content.fields)?;
        Ok(())
    }

    /// Reindex every live version in the ledger. Returns how many were sent.
    pub fn rebuild_index(&self) -> FixityResult<usize> {
        let mut count = 0;
        for entry in self.ledger.live() {
            if let Some(hash) = entry?.block.content() {
                self.reindex(hash)?;
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn search(&self, query: &Query) -> FixityResult<Vec<Ref>> {
        Ok(self.index.search(query)?)
    }

    /// Ids with a pointer, sorted.
    pub fn ids(&self) -> FixityResult<Vec<String>> {
        Ok(self.db.ids()?)
    }
}

impl std::fmt::Debug for Fixity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fixity")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Wires already-constructed backends into a [`Fixity`].
#[derive(Default)]
pub struct FixityBuilder {
    store: Option<Arc<dyn ObjectStore>>,
    db: Option<Arc<dyn PointerStore>>,
    index: Option<Arc<dyn Index>>,
    config: FixityConfig,
}

impl FixityBuilder {
    pub fn store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn pointers(mut self, db: Arc<dyn PointerStore>) -> Self {
        self.db = Some(db);
        self
    }

    pub fn index(mut self, index: Arc<dyn Index>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn config(mut self, config: FixityConfig) -> Self {
        self.config = config;
        self
    }

    /// Fails when a backend is missing or the default chunk size is invalid.
    pub fn build(self) -> FixityResult<Fixity> {
        ChunkParams::new(self.config.default_average_chunk_size)?;
        let store = self
            .store
            .ok_or_else(|| FixityError::Config("object store not set".into()))?;
        let db = self
            .db
            .ok_or_else(|| FixityError::Config("pointer store not set".into()))?;
        let index = self
            .index
            .ok_or_else(|| FixityError::Config("index not set".into()))?;
        Ok(Fixity::from_parts(store, db, index, self.config))
    }
}
