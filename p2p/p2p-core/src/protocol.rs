//! The request/response pairs exchanged with peers.
//!
//! The transport layer translates network messages into these enums; the
//! rest of the stack never sees raw messages. The ancestors request is the
//! one protocol exchange whose response is not a single message but a
//! stream: the peer keeps sending summaries until it has exhausted the
//! requested ancestry or the requester stops pulling.

use futures::stream::BoxStream;

use galena_wire::{AncestorsRequest, BlockSummary};

/// A stream of block summaries produced by one peer in response to an
/// [`AncestorsRequest`].
///
/// The stream is pull-based, so the peer task behind it only produces as
/// fast as the consumer reads. Dropping the stream cancels the producer.
pub type SummaryStream = BoxStream<'static, Result<BlockSummary, tower::BoxError>>;

/// A request to a peer.
#[derive(Debug, Clone)]
pub enum PeerRequest {
    /// Ask the peer to stream the summaries of the targets' ancestry.
    AncestorSummaries(AncestorsRequest),
}

/// A peer's response to a [`PeerRequest`].
pub enum PeerResponse {
    /// A lazy, finite stream of ancestor summaries.
    AncestorSummaries(SummaryStream),
}
