//! Hashing primitives for Fixity.
//!
//! Provides domain-separated BLAKE3 hashing. Every stored record kind has its
//! own domain tag so that, for example, a chunk and a block with identical
//! bytes never share a [`fixity_types::Ref`].
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod hasher;

pub use hasher::ContentHasher;
