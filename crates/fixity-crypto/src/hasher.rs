use fixity_types::Ref;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g., `"fixity-chunk-v1"`) that is
/// prepended to every hash computation. Changing a tag changes every ref of
/// that kind, so the tags are part of the storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for raw chunk bytes.
    pub const CHUNK: Self = Self {
        domain: "fixity-chunk-v1",
    };
    /// Hasher for blob records (ordered chunk lists).
    pub const BLOB: Self = Self {
        domain: "fixity-blob-v1",
    };
    /// Hasher for content (version) records.
    pub const CONTENT: Self = Self {
        domain: "fixity-content-v1",
    };
    /// Hasher for ledger blocks.
    pub const BLOCK: Self = Self {
        domain: "fixity-block-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Ref {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Ref::from_hash(*hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected ref.
    pub fn verify(&self, data: &[u8], expected: &Ref) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let data = b"foo bar baz";
        assert_eq!(ContentHasher::CHUNK.hash(data), ContentHasher::CHUNK.hash(data));
    }

    #[test]
    fn different_domains_produce_different_hashes() {
        let data = b"same bytes";
        let all = [
            ContentHasher::CHUNK.hash(data),
            ContentHasher::BLOB.hash(data),
            ContentHasher::CONTENT.hash(data),
            ContentHasher::BLOCK.hash(data),
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn verify_detects_tampering() {
        let id = ContentHasher::BLOCK.hash(b"original");
        assert!(ContentHasher::BLOCK.verify(b"original", &id));
        assert!(!ContentHasher::BLOCK.verify(b"tampered", &id));
    }

    #[test]
    fn domain_hash_differs_from_raw_ref() {
        let raw = Ref::from_bytes(b"data");
        assert_ne!(ContentHasher::CHUNK.hash(b"data"), raw);
        assert_eq!(ContentHasher::new("x").domain(), "x");
    }
}
