//! Metadata index for Fixity.
//!
//! After every write the content ref, its id, and its fields are handed to
//! an [`Index`]; after a delete the deleted versions are removed from it.
//! Both are idempotent, so a failed notification can simply be repeated.
//!
//! - [`Index`] -- the capability trait
//! - [`Query`] -- conjunction of exact field matches plus an optional id
//! - [`InMemoryIndex`] -- BTreeMap postings, for tests and embedding

pub mod error;
pub mod memory;
pub mod query;
pub mod traits;

pub use error::{IndexError, IndexResult};
pub use memory::InMemoryIndex;
pub use query::Query;
pub use traits::Index;
