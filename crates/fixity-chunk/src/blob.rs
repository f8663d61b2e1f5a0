use std::io::Read;

use fixity_store::{ObjectKind, ObjectStore, Record, RecordStoreExt};
use fixity_types::Ref;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chunker::{ChunkParams, Chunker};
use crate::error::ChunkResult;

/// Ordered list of chunk refs reconstituting one complete byte stream.
///
/// Concatenating the chunks named by `chunks`, in order, reproduces the
/// original input exactly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub chunks: Vec<Ref>,
    /// Sum of all chunk sizes.
    pub size: u64,
    /// The average chunk size the chunks were cut with.
    pub average_chunk_size: u64,
}

impl Record for Blob {
    const KIND: ObjectKind = ObjectKind::Blob;
}

/// Persists a byte stream as chunks plus a [`Blob`] record.
pub struct BlobWriter<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    params: ChunkParams,
}

impl<'a, S: ObjectStore + ?Sized> BlobWriter<'a, S> {
    /// Create a writer cutting chunks around `average` bytes.
    pub fn new(store: &'a S, average: u64) -> ChunkResult<Self> {
        Ok(Self {
            store,
            params: ChunkParams::new(average)?,
        })
    }

    /// Chunk `reader` to the end, store every chunk, then store the blob.
    ///
    /// Chunks written before a failure stay in the store. They are harmless:
    /// nothing references them until a blob that names them is written.
    pub fn write<R: Read>(&self, reader: R) -> ChunkResult<(Ref, Blob)> {
        let mut chunks = Vec::new();
        let mut size = 0u64;

        for chunk in Chunker::with_params(reader, self.params) {
            let chunk = chunk?;
            let id = self.store.write(&chunk.to_stored_object())?;
            size += chunk.size;
            chunks.push(id);
        }

        let blob = Blob {
            chunks,
            size,
            average_chunk_size: self.params.average(),
        };
        let id = self.store.put_record(&blob)?;
        debug!(blob = %id, chunks = blob.chunks.len(), size, "stored blob");
        Ok((id, blob))
    }
}
