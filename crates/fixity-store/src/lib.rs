//! Content-addressed object storage for Fixity.
//!
//! Every persisted record (chunks, blobs, content versions, ledger blocks) is
//! an immutable [`StoredObject`] identified by its BLAKE3 hash,
//! domain-separated by [`ObjectKind`]. The kind travels with the bytes, so a
//! reader walking the store can tell record kinds apart without external
//! metadata.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`LocalObjectStore`] -- durable, fan-out directory of one file per object
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Writes are idempotent: writing an existing object is a no-op success.
//! 3. `write_at` never stores bytes that do not hash to the requested ref.
//! 4. The store never interprets object contents; typed decoding lives in
//!    [`Record`] implementations owned by the crates that define the records.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod local;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use local::LocalObjectStore;
pub use memory::InMemoryObjectStore;
pub use object::{ObjectKind, Record, StoredObject};
pub use traits::{ObjectStore, RecordStoreExt};
