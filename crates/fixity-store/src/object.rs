use fixity_crypto::ContentHasher;
use fixity_types::Ref;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};

/// The kind of record stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ObjectKind {
    /// Raw bytes of one content-defined chunk.
    Chunk,
    /// Ordered list of chunk refs reconstituting one byte stream.
    Blob,
    /// One version of an id's data.
    Content,
    /// One ledger entry.
    Block,
}

impl ObjectKind {
    /// On-disk tag byte for this kind.
    pub fn tag(self) -> u8 {
        match self {
            Self::Chunk => 1,
            Self::Blob => 2,
            Self::Content => 3,
            Self::Block => 4,
        }
    }

    /// Parse an on-disk tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Chunk),
            2 => Some(Self::Blob),
            3 => Some(Self::Content),
            4 => Some(Self::Block),
            _ => None,
        }
    }

    /// The domain-separated hasher for this kind.
    pub fn hasher(self) -> &'static ContentHasher {
        match self {
            Self::Chunk => &ContentHasher::CHUNK,
            Self::Blob => &ContentHasher::BLOB,
            Self::Content => &ContentHasher::CONTENT,
            Self::Block => &ContentHasher::BLOCK,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chunk => write!(f, "chunk"),
            Self::Blob => write!(f, "blob"),
            Self::Content => write!(f, "content"),
            Self::Block => write!(f, "block"),
        }
    }
}

/// A stored object: kind tag + serialized data + cached size.
///
/// `StoredObject` is the unit of storage. Its ref is the kind's domain hash of
/// `data`, so the same bytes stored as two different kinds get two refs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// The type of this object.
    pub kind: ObjectKind,
    /// The serialized bytes of the object.
    pub data: Vec<u8>,
    /// The size of `data` in bytes.
    pub size: u64,
}

impl StoredObject {
    /// Create a new stored object from kind and data.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { kind, data, size }
    }

    /// Compute the content-addressed ref for this object.
    pub fn compute_id(&self) -> Ref {
        self.kind.hasher().hash(&self.data)
    }
}

/// A typed record that round-trips through a [`StoredObject`].
///
/// Records are encoded as JSON. Decoding checks the kind tag first, so a
/// block can never be mistaken for a content record.
pub trait Record: Serialize + DeserializeOwned {
    /// The kind tag this record is stored under.
    const KIND: ObjectKind;

    /// Convert into a `StoredObject` for storage.
    fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(Self::KIND, data))
    }

    /// Decode from a `StoredObject`.
    fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        if obj.kind != Self::KIND {
            return Err(StoreError::CorruptObject {
                id: obj.compute_id(),
                reason: format!("expected {}, got {}", Self::KIND, obj.kind),
            });
        }
        serde_json::from_slice(&obj.data).map_err(|e| StoreError::CorruptObject {
            id: obj.compute_id(),
            reason: e.to_string(),
        })
    }
}
