//! Block summaries.
//!
//! A summary is the header-level metadata of a block: its hash, the links to
//! the rest of the DAG and the producer-asserted rank. No deploys and no
//! post-state; summaries are what nodes exchange to agree on the *shape* of
//! the DAG before committing to downloading full blocks.

use borsh::{BorshDeserialize, BorshSerialize};

/// A block's content-addressed identifier.
pub type BlockHash = [u8; 32];

/// The identifier of a validator (a hash of its public key).
pub type ValidatorId = [u8; 32];

/// A consensus-level reference to the latest block a validator has built on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Justification {
    /// The validator this justification belongs to.
    pub validator: ValidatorId,
    /// The latest block of that validator seen by the summary's producer.
    pub latest_block_hash: BlockHash,
}

/// The header fields of a summary.
#[derive(Debug, Copy, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SummaryHeader {
    /// The block's topological rank as asserted by its producer.
    ///
    /// Monotonically increasing along parent edges.
    pub rank: u64,
    /// Producer-asserted creation time, in milliseconds since the unix epoch.
    pub timestamp_ms: u64,
}

/// The header-level metadata of one block.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BlockSummary {
    /// The block's hash.
    pub block_hash: BlockHash,
    /// The block's parents, empty only for a genesis summary.
    pub parent_hashes: Vec<BlockHash>,
    /// The block's justifications.
    pub justifications: Vec<Justification>,
    /// The block's header fields.
    pub header: SummaryHeader,
}

impl BlockSummary {
    /// The block's rank.
    pub const fn rank(&self) -> u64 {
        self.header.rank
    }

    /// Every hash that must be present in a DAG for this summary to be
    /// integrated into it: the parents plus the justifications' latest block
    /// hashes.
    ///
    /// The same hash can be yielded more than once, e.g. when a parent is
    /// also a justification.
    pub fn dependencies(&self) -> impl Iterator<Item = BlockHash> + '_ {
        self.parent_hashes
            .iter()
            .copied()
            .chain(self.justifications.iter().map(|j| j.latest_block_hash))
    }
}
