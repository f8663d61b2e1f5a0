use fixity_store::{Record, StoreError};
use fixity_types::Ref;
use tracing::warn;

use crate::block::Block;
use crate::chain::Blockchain;
use crate::error::LedgerResult;

/// Result of [`Blockchain::verify`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainReport {
    /// Blocks reached walking back from head.
    pub block_count: u64,
    pub violations: Vec<Violation>,
}

impl ChainReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation found while walking the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub block: Ref,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    /// A block's number is not one less than its successor's.
    NumberGap,
    /// The chain ends at a block that is not number 1, or block 1 has a
    /// previous ref.
    BadGenesis,
    /// The stored bytes do not hash to the block's ref.
    HashMismatch,
    /// A referenced block is absent, unreadable or undecodable.
    MissingBlock,
}

impl Blockchain {
    /// Walk the raw chain from head and collect every integrity violation.
    ///
    /// Backend failures abort with an error; problems with the chain itself,
    /// including blocks the store refuses as tampered, are reported, not
    /// thrown. An empty ledger is valid.
    pub fn verify(&self) -> LedgerResult<ChainReport> {
        let mut report = ChainReport::default();
        let mut next = self.head_ref()?;
        let mut expected: Option<u64> = None;

        while let Some(hash) = next.take() {
            let object = match self.store().read(&hash) {
                Ok(Some(object)) => object,
                Ok(None) => {
                    report.push(hash, ViolationKind::MissingBlock, "block is missing".into());
                    break;
                }
                Err(StoreError::HashMismatch { computed, .. }) => {
                    report.push(
                        hash,
                        ViolationKind::HashMismatch,
                        format!("stored bytes hash to {computed}"),
                    );
                    break;
                }
                Err(StoreError::CorruptObject { reason, .. }) => {
                    report.push(hash, ViolationKind::MissingBlock, format!("unreadable block: {reason}"));
                    break;
                }
                Err(e) => return Err(e.into()),
            };
            let computed = object.compute_id();
            if computed != hash {
                report.push(
                    hash,
                    ViolationKind::HashMismatch,
                    format!("stored bytes hash to {computed}"),
                );
            }
            let block = match Block::from_stored_object(&object) {
                Ok(block) => block,
                Err(e) => {
                    report.push(hash, ViolationKind::MissingBlock, format!("undecodable block: {e}"));
                    break;
                }
            };
            report.block_count += 1;

            if let Some(expected) = expected {
                if block.number != expected {
                    report.push(
                        hash,
                        ViolationKind::NumberGap,
                        format!("expected number {expected}, found {}", block.number),
                    );
                }
            }
            match (block.number, block.previous) {
                (1, Some(_)) => report.push(
                    hash,
                    ViolationKind::BadGenesis,
                    "block 1 links to a previous block".into(),
                ),
                (n, None) if n != 1 => report.push(
                    hash,
                    ViolationKind::BadGenesis,
                    format!("chain ends at block {n}"),
                ),
                _ => {}
            }
            // Stop at 1 as well, so a bad link cannot loop us forever.
            if block.number <= 1 {
                break;
            }
            expected = Some(block.number - 1);
            next = block.previous;
        }

        if !report.is_valid() {
            warn!(violations = report.violations.len(), "ledger verification failed");
        }
        Ok(report)
    }
}

impl ChainReport {
    fn push(&mut self, block: Ref, kind: ViolationKind, description: String) {
        self.violations.push(Violation {
            block,
            kind,
            description,
        });
    }
}
