//! Content-defined chunking and blob assembly for Fixity.
//!
//! A byte stream is split by [`Chunker`] into chunks whose boundaries depend
//! only on the bytes themselves and the configured average size. Identical
//! byte runs therefore produce identical chunks, and identical chunks are
//! stored once.
//!
//! - [`Chunker`] -- lazy, finite, non-restartable chunk iterator over any `Read`
//! - [`BlobWriter`] -- persists every chunk, then the [`Blob`] record listing them
//! - [`BlobReader`] -- `Read` over a blob, fetching each chunk only when needed

pub mod blob;
pub mod chunker;
pub mod error;
pub mod gear;
pub mod reader;

pub use blob::{Blob, BlobWriter};
pub use chunker::{Chunk, ChunkParams, Chunker, DEFAULT_AVERAGE_CHUNK_SIZE, MAX_AVERAGE_CHUNK_SIZE};
pub use error::{ChunkError, ChunkResult};
pub use reader::BlobReader;
