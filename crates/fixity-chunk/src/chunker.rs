use std::io::{self, Read};

use fixity_store::{ObjectKind, StoredObject};
use fixity_types::Ref;

use crate::error::{ChunkError, ChunkResult};
use crate::gear::GEAR;

/// Average chunk size used when neither the caller nor a previous version
/// supplies one (1 MiB).
pub const DEFAULT_AVERAGE_CHUNK_SIZE: u64 = 1024 * 1024;

/// Largest accepted average chunk size (64 MiB). A single chunk is held in
/// memory, and chunks may grow to three times the average.
pub const MAX_AVERAGE_CHUNK_SIZE: u64 = 64 * 1024 * 1024;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Size parameters derived from an average chunk size.
///
/// - `min = average / 2`: no boundary is declared until more than `min` bytes
///   have accumulated.
/// - `max = average * 3`: a boundary is forced once `max` bytes accumulate.
/// - the mask selects the top `floor(log2(average - min))` fingerprint bits,
///   so a natural boundary follows `min` after roughly `average - min` bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkParams {
    average: u64,
    min: u64,
    max: u64,
    mask: u64,
}

impl ChunkParams {
    /// Derive parameters from an average chunk size.
    pub fn new(average: u64) -> ChunkResult<Self> {
        if average == 0 || average > MAX_AVERAGE_CHUNK_SIZE {
            return Err(ChunkError::InvalidAverageChunkSize(average));
        }
        let min = average / 2;
        let max = average * 3;
        let bits = 63 - (average - min).leading_zeros();
        let mask = if bits == 0 { 0 } else { u64::MAX << (64 - bits) };
        Ok(Self {
            average,
            min,
            max,
            mask,
        })
    }

    pub fn average(&self) -> u64 {
        self.average
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    fn is_boundary(&self, len: u64, fingerprint: u64) -> bool {
        len >= self.max || (len > self.min && fingerprint & self.mask == 0)
    }
}

impl Default for ChunkParams {
    fn default() -> Self {
        // DEFAULT_AVERAGE_CHUNK_SIZE is within bounds.
        let min = DEFAULT_AVERAGE_CHUNK_SIZE / 2;
        let bits = 63 - (DEFAULT_AVERAGE_CHUNK_SIZE - min).leading_zeros();
        Self {
            average: DEFAULT_AVERAGE_CHUNK_SIZE,
            min,
            max: DEFAULT_AVERAGE_CHUNK_SIZE * 3,
            mask: u64::MAX << (64 - bits),
        }
    }
}

/// One content-defined slice of a larger stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub data: Vec<u8>,
    pub size: u64,
}

impl Chunk {
    pub fn new(data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { data, size }
    }

    /// The ref this chunk is stored under.
    pub fn id(&self) -> Ref {
        ObjectKind::Chunk.hasher().hash(&self.data)
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Chunk, self.data.clone())
    }
}

/// Splits a byte stream into content-defined chunks.
///
/// A gear fingerprint (`fp = (fp << 1) + GEAR[byte]`) rolls over the bytes
/// since the last boundary and is reset at every boundary. The final partial
/// chunk is emitted at end-of-stream whatever its size; an empty stream yields
/// no chunks. After end-of-stream or the first read error the iterator only
/// returns `None`.
pub struct Chunker<R> {
    reader: R,
    params: ChunkParams,
    buf: Box<[u8]>,
    pos: usize,
    filled: usize,
    done: bool,
}

impl<R: Read> Chunker<R> {
    /// Create a chunker with parameters derived from `average`.
    pub fn new(reader: R, average: u64) -> ChunkResult<Self> {
        Ok(Self::with_params(reader, ChunkParams::new(average)?))
    }

    pub fn with_params(reader: R, params: ChunkParams) -> Self {
        Self {
            reader,
            params,
            buf: vec![0u8; READ_BUFFER_SIZE].into_boxed_slice(),
            pos: 0,
            filled: 0,
            done: false,
        }
    }

    pub fn params(&self) -> &ChunkParams {
        &self.params
    }

    /// Refill the read buffer. Returns `false` at end-of-stream.
    fn fill(&mut self) -> io::Result<bool> {
        loop {
            match self.reader.read(&mut self.buf) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    self.pos = 0;
                    self.filled = n;
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn next_chunk(&mut self) -> ChunkResult<Option<Chunk>> {
        let initial = self.params.min.min(READ_BUFFER_SIZE as u64) as usize;
        let mut data = Vec::with_capacity(initial);
        let mut fingerprint: u64 = 0;

        loop {
            if self.pos == self.filled && !self.fill()? {
                self.done = true;
                break;
            }
            while self.pos < self.filled {
                let byte = self.buf[self.pos];
                self.pos += 1;
                data.push(byte);
                fingerprint = (fingerprint << 1).wrapping_add(GEAR[byte as usize]);
                if self.params.is_boundary(data.len() as u64, fingerprint) {
                    return Ok(Some(Chunk::new(data)));
                }
            }
        }

        if data.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Chunk::new(data)))
        }
    }
}

impl<R: Read> Iterator for Chunker<R> {
    type Item = ChunkResult<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done && self.pos == self.filled {
            return None;
        }
        match self.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                self.pos = self.filled;
                Some(Err(e))
            }
        }
    }
}
