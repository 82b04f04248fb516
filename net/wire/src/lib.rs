//! # Galena Wire
//!
//! This crate defines the data types that cross the wire between Galena
//! nodes: block summaries, their justification links, and the request
//! messages of the ancestor-streaming protocol.
//!
//! Everything here is encoding-ready ([`borsh`]) and carries no networking
//! logic; the P2P crates decide when and to whom these types are sent.

mod protocol;
mod summary;

pub use protocol::AncestorsRequest;
pub use summary::{BlockHash, BlockSummary, Justification, SummaryHeader, ValidatorId};
