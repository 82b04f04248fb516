//! Connection handles.
//!
//! A connection is split in two: the [`ConnectionGuard`], held by the task
//! that owns the transport, and the [`ConnectionHandle`], cloned to every
//! task that may need to disconnect or ban the peer.

use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use tokio::sync::OwnedSemaphorePermit;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Why a peer is being banned.
///
/// The address book treats the classes differently: a structural violation
/// can come from a confused peer on a forked chain, invalid data cannot.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BanReason {
    /// The peer's DAG violated a structural bound: too deep, too wide, or
    /// not connected to what was asked for.
    StructuralViolation,
    /// The peer sent data that failed semantic validation.
    InvalidData,
}

/// A ban placed on a peer.
#[derive(Debug, Copy, Clone)]
pub struct BanPeer {
    /// How long the peer should not be reconnected to.
    pub duration: Duration,
    /// What the peer did.
    pub reason: BanReason,
}

/// Creates the two halves of a new connection: the [`ConnectionGuard`] for
/// the connection task and the [`ConnectionHandle`] for everyone else.
///
/// `permit` is the connection-count permit this connection holds while
/// alive, if the hosting process bounds its connections.
pub fn new_connection(
    permit: Option<OwnedSemaphorePermit>,
) -> (ConnectionGuard, ConnectionHandle) {
    let token = CancellationToken::new();

    let guard = ConnectionGuard {
        token: token.clone(),
        _permit: permit,
    };
    let handle = ConnectionHandle {
        token,
        ban: Arc::new(OnceLock::new()),
    };

    (guard, handle)
}

/// The half of a connection held by the task that owns the transport.
///
/// Dropping the guard closes the connection for every handle.
pub struct ConnectionGuard {
    token: CancellationToken,
    _permit: Option<OwnedSemaphorePermit>,
}

impl ConnectionGuard {
    /// Resolves once some handle asked for the connection to close.
    pub fn shutdown_requested(&self) -> WaitForCancellationFutureOwned {
        self.token.clone().cancelled_owned()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// A handle to a connection, used to disconnect the peer, ban it, and check
/// whether the connection is still alive.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    token: CancellationToken,
    ban: Arc<OnceLock<BanPeer>>,
}

impl ConnectionHandle {
    /// Bans the peer and disconnects it.
    ///
    /// The first ban recorded wins: later calls still disconnect, but do
    /// not overwrite the recorded duration or reason.
    pub fn ban_peer(&self, ban: BanPeer) {
        let _ = self.ban.set(ban);
        self.token.cancel();
    }

    /// The ban recorded for this peer, if any.
    pub fn pending_ban(&self) -> Option<BanPeer> {
        self.ban.get().copied()
    }

    /// Asks the connection task to disconnect, without banning the peer.
    pub fn disconnect(&self) {
        self.token.cancel();
    }

    /// Whether the connection is closed (or closing).
    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}
