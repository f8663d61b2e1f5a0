use std::io::{self, Read};
use std::sync::Arc;

use fixity_store::{ObjectKind, ObjectStore};
use fixity_types::Ref;

use crate::blob::Blob;
use crate::error::ChunkError;

/// `Read` over the bytes of a [`Blob`].
///
/// Chunk N+1 is fetched from the store only after chunk N has been fully
/// consumed. A missing chunk is reported when the reader reaches it, as an
/// `io::Error` of kind `NotFound` wrapping [`ChunkError::ChunkNotFound`].
pub struct BlobReader<S: ObjectStore + ?Sized> {
    store: Arc<S>,
    chunks: Vec<Ref>,
    size: u64,
    next: usize,
    current: Vec<u8>,
    offset: usize,
}

impl<S: ObjectStore + ?Sized> BlobReader<S> {
    pub fn new(store: Arc<S>, blob: Blob) -> Self {
        Self {
            store,
            chunks: blob.chunks,
            size: blob.size,
            next: 0,
            current: Vec::new(),
            offset: 0,
        }
    }

    /// Total byte length of the blob.
    pub fn size(&self) -> u64 {
        self.size
    }

    fn load_next(&mut self) -> io::Result<()> {
        let id = self.chunks[self.next];
        let object = match self.store.read(&id) {
            Ok(Some(object)) => object,
            Ok(None) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    ChunkError::ChunkNotFound(id),
                ))
            }
            Err(e) => return Err(io::Error::other(ChunkError::Store(e))),
        };
        if object.kind != ObjectKind::Chunk {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                ChunkError::NotAChunk(id),
            ));
        }
        self.current = object.data;
        self.offset = 0;
        self.next += 1;
        Ok(())
    }
}

impl<S: ObjectStore + ?Sized> Read for BlobReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.offset == self.current.len() {
            if self.next == self.chunks.len() {
                return Ok(0);
            }
            self.load_next()?;
        }
        let n = buf.len().min(self.current.len() - self.offset);
        buf[..n].copy_from_slice(&self.current[self.offset..self.offset + n]);
        self.offset += n;
        Ok(n)
    }
}

impl<S: ObjectStore + ?Sized> std::fmt::Debug for BlobReader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobReader")
            .field("chunks", &self.chunks.len())
            .field("next", &self.next)
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::BlobWriter;
    use fixity_store::{InMemoryObjectStore, StoreResult, StoredObject};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store wrapper counting chunk reads.
    struct CountingStore {
        inner: InMemoryObjectStore,
        reads: AtomicUsize,
    }

    impl ObjectStore for CountingStore {
        fn read(&self, id: &Ref) -> StoreResult<Option<StoredObject>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read(id)
        }
        fn write(&self, object: &StoredObject) -> StoreResult<Ref> {
            self.inner.write(object)
        }
        fn exists(&self, id: &Ref) -> StoreResult<bool> {
            self.inner.exists(id)
        }
        fn list(&self) -> StoreResult<Box<dyn Iterator<Item = StoreResult<Ref>> + '_>> {
            self.inner.list()
        }
    }

    fn random_bytes(len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        StdRng::seed_from_u64(42).fill(&mut data[..]);
        data
    }

    #[test]
    fn roundtrip_is_byte_exact() {
        let store = Arc::new(InMemoryObjectStore::new());
        let data = random_bytes(123_457);
        let (_, blob) = BlobWriter::new(store.as_ref(), 2048)
            .unwrap()
            .write(&data[..])
            .unwrap();

        let mut reader = BlobReader::new(store, blob);
        assert_eq!(reader.size(), data.len() as u64);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn empty_blob_reads_nothing() {
        let store = Arc::new(InMemoryObjectStore::new());
        let (_, blob) = BlobWriter::new(store.as_ref(), 64).unwrap().write(&b""[..]).unwrap();
        let mut out = Vec::new();
        BlobReader::new(store, blob).read_to_end(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn chunks_are_fetched_lazily() {
        let store = Arc::new(CountingStore {
            inner: InMemoryObjectStore::new(),
            reads: AtomicUsize::new(0),
        });
        let data = random_bytes(40_000);
        let (_, blob) = BlobWriter::new(store.as_ref(), 1024)
            .unwrap()
            .write(&data[..])
            .unwrap();
        let chunk_count = blob.chunks.len();
        assert!(chunk_count > 2);

        let mut reader = BlobReader::new(Arc::clone(&store), blob);
        assert_eq!(store.reads.load(Ordering::SeqCst), 0);

        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte).unwrap();
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(store.reads.load(Ordering::SeqCst), chunk_count);
    }

    #[test]
    fn missing_chunk_fails_only_when_reached() {
        let full = Arc::new(InMemoryObjectStore::new());
        let data = random_bytes(30_000);
        let (_, blob) = BlobWriter::new(full.as_ref(), 1024)
            .unwrap()
            .write(&data[..])
            .unwrap();

        // Copy every chunk but the last into a fresh store.
        let partial = Arc::new(InMemoryObjectStore::new());
        let (last, rest) = blob.chunks.split_last().unwrap();
        for id in rest {
            partial.write(&full.fetch(id).unwrap()).unwrap();
        }
        let first_len = full.fetch(&blob.chunks[0]).unwrap().data.len();

        let mut reader = BlobReader::new(partial, blob.clone());
        let mut head = vec![0u8; first_len];
        reader.read_exact(&mut head).unwrap();
        assert_eq!(&head[..], &data[..first_len]);

        let mut tail = Vec::new();
        let err = reader.read_to_end(&mut tail).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(matches!(
            ChunkError::from_io(&err),
            Some(ChunkError::ChunkNotFound(id)) if id == last
        ));
    }

    #[test]
    fn non_chunk_ref_is_invalid_data() {
        let store = Arc::new(InMemoryObjectStore::new());
        let (blob_id, _) = BlobWriter::new(store.as_ref(), 64).unwrap().write(&b"x"[..]).unwrap();
        let bogus = Blob {
            chunks: vec![blob_id],
            size: 1,
            average_chunk_size: 64,
        };
        let err = BlobReader::new(store, bogus)
            .read_to_end(&mut Vec::new())
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
