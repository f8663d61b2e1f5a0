use fixity_store::{ObjectKind, Record};
use fixity_types::Ref;
use serde::{Deserialize, Serialize};

/// What a block records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// A new content version was written.
    Content { hash: Ref },
    /// The listed content blocks are logically deleted.
    Delete { hashes: Vec<Ref> },
}

/// One ledger entry.
///
/// A block's own ref is the hash of its stored bytes and is not part of the
/// record; [`BlockRef`] pairs the two.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the ledger, starting at 1.
    pub number: u64,
    /// Ref of the block before this one; `None` only for block 1.
    pub previous: Option<Ref>,
    pub kind: BlockKind,
}

impl Block {
    /// The content ref of a content block.
    pub fn content(&self) -> Option<&Ref> {
        match &self.kind {
            BlockKind::Content { hash } => Some(hash),
            BlockKind::Delete { .. } => None,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self.kind, BlockKind::Delete { .. })
    }

    pub fn is_genesis(&self) -> bool {
        self.previous.is_none()
    }
}

impl Record for Block {
    const KIND: ObjectKind = ObjectKind::Block;
}

/// A block together with the ref it is stored under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockRef {
    pub hash: Ref,
    pub block: Block,
}
