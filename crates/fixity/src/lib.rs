//! Fixity: deduplicated, versioned, content-addressed storage.
//!
//! Bytes written under an id are cut into content-defined chunks, stored by
//! hash, and described by an immutable [`Content`] record linking back to the
//! previous version. Every write is announced in an append-only ledger;
//! deletes are further ledger entries that hide earlier ones from traversal.
//! The only mutable state is a pair of pointers: `id -> latest content` and
//! the ledger head.
//!
//! ```no_run
//! use std::io::Read;
//! use fixity::{Fixity, FixityConfig};
//!
//! # fn main() -> Result<(), fixity::FixityError> {
//! let fixity = Fixity::open("/var/lib/fixity", FixityConfig::default())?;
//! fixity.write("doc1", vec![], &b"foo bar baz"[..], None)?;
//!
//! let (content, mut reader) = fixity.read("doc1")?;
//! let mut bytes = Vec::new();
//! reader.read_to_end(&mut bytes)?;
//! assert_eq!(content.content.id, "doc1");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod repository;
mod locks;

pub use config::FixityConfig;
pub use content::{Content, ContentRef, History};
pub use error::{FixityError, FixityResult};
pub use repository::{ContentReader, Fixity, FixityBuilder};

pub use fixity_chunk::{Blob, DEFAULT_AVERAGE_CHUNK_SIZE};
pub use fixity_index::Query;
pub use fixity_ledger::{Block, BlockKind, BlockRef, Blockchain};
pub use fixity_types::{Field, Ref};
