//! Foundation types for Fixity.
//!
//! Every other Fixity crate depends on `fixity-types`.
//!
//! # Key Types
//!
//! - [`Ref`] -- Content-addressed reference (BLAKE3 hash) naming a stored record
//! - [`Field`] -- A named metadata value attached to a content version for indexing
//! - [`TypeError`] -- Parse failures for the types above

pub mod error;
pub mod field;
pub mod reference;

pub use error::TypeError;
pub use field::Field;
pub use reference::Ref;
