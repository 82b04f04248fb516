//! Protocol messages.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::BlockHash;

/// A request for a stream of ancestor block summaries.
///
/// The receiving peer is expected to reply with the summaries of
/// `target_block_hashes` and their ancestry, walking at most `max_depth`
/// hops and stopping when it reaches the `known_block_hashes` frontier.
///
/// Receivers must treat the reply as untrusted: nothing obliges a peer to
/// honor any of these bounds.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AncestorsRequest {
    /// The hashes whose ancestry is wanted.
    pub target_block_hashes: Vec<BlockHash>,
    /// Hashes the requester already has; their ancestry need not be sent.
    pub known_block_hashes: Vec<BlockHash>,
    /// The maximum number of parent hops the reply may span.
    pub max_depth: u64,
}
