//! # Galena P2P Core
//!
//! Low-level peer primitives for the Galena P2P stack: the network-zone
//! abstraction, connection handles (cancellation and banning), the peer
//! [`Client`](client::Client) service and the request/response protocol
//! enums.
//!
//! This crate deliberately knows nothing about transports or handshakes:
//! it models a peer as a [`tower::Service`] fed by some connection task. The
//! higher level crates (e.g. `galena-dag-sync`) drive that service; the
//! hosting process supplies the connection tasks.

use std::{fmt::Debug, hash::Hash};

pub mod client;
pub mod error;
pub mod handles;
mod network_zones;
mod protocol;

pub use error::{ErrorSlot, PeerError};
pub use network_zones::ClearNet;
pub use protocol::{PeerRequest, PeerResponse, SummaryStream};

/// The direction of a connection.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ConnectionDirection {
    /// An inbound connection to our node.
    Inbound,
    /// An outbound connection from our node.
    Outbound,
}

/// An address on a specific [`NetworkZone`].
pub trait NetZoneAddress:
    std::fmt::Display + Debug + Hash + Eq + Copy + Send + Sync + Unpin + 'static
{
    /// The identifier peers are banned by.
    ///
    /// Bans must not be keyed on the full address: for clear-net addresses
    /// that would let a peer evade a ban by reconnecting from another port,
    /// so there the ban ID is the IP address alone.
    type BanID: Debug + Hash + Eq + Clone + Copy + Send + 'static;

    /// Returns the [`Self::BanID`] for this address.
    fn ban_id(&self) -> Self::BanID;
}

/// An abstraction over a network zone (clear net / anonymity networks).
pub trait NetworkZone: Clone + Copy + Send + 'static {
    /// The network's name.
    const NAME: &'static str;

    /// The address type of this network.
    type Addr: NetZoneAddress;
}
