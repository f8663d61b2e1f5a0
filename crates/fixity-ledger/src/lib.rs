//! Append-only block ledger for Fixity.
//!
//! The ledger is a hash-linked sequence of [`Block`]s stored as ordinary
//! records in the object store. Each block either announces one new content
//! version or logically deletes earlier content blocks. Nothing is ever
//! rewritten: a delete is a newer block naming older ones, and the
//! skip-aware traversal ([`Blockchain::live`]) hides what it names.
//!
//! - [`Blockchain`] -- append, delete, traversal, pagination, lookup
//! - [`Block`] / [`BlockKind`] -- the stored record
//! - [`ChainReport`] -- result of [`Blockchain::verify`]

pub mod block;
pub mod chain;
pub mod error;
pub mod validation;

pub use block::{Block, BlockKind, BlockRef};
pub use chain::{BlockPage, Blockchain, Blocks, Live};
pub use error::{LedgerError, LedgerResult};
pub use validation::{ChainReport, Violation, ViolationKind};
