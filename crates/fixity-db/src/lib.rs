//! Local pointer database for Fixity.
//!
//! The ledger and the content records are immutable. The only mutable state a
//! node keeps is a handful of pointers:
//!
//! - `id -> latest content ref`, so reading the newest version of an id does
//!   not walk its history
//! - `ledger head -> newest block ref`
//!
//! Both live behind the [`PointerStore`] trait. [`InMemoryPointerStore`] is
//! for tests, [`FilePointerStore`] replays a CRC-framed append-only log.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{DbError, DbResult};
pub use file::FilePointerStore;
pub use memory::InMemoryPointerStore;
pub use traits::PointerStore;
