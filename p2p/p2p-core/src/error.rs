//! Peer connection errors.

use std::sync::{Arc, OnceLock};

/// An error on a peer connection.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum PeerError {
    #[error("The connection was closed.")]
    ConnectionClosed,
    #[error("The connection task's client channel was closed.")]
    ClientChannelClosed,
}

/// The first error that killed a peer connection.
///
/// Shared between a [`Client`](crate::client::Client) and its connection
/// task. Both halves can fail independently (the client noticing the peer
/// gone, the task noticing the transport gone); whichever records first
/// wins, and every later observer sees the same cause.
#[derive(Debug, Clone, Default)]
pub struct ErrorSlot(Arc<OnceLock<PeerError>>);

impl ErrorSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `err` as the connection's cause of death, unless a cause is
    /// already recorded. Returns the error now in the slot.
    pub fn record(&self, err: PeerError) -> PeerError {
        *self.0.get_or_init(|| err)
    }

    /// The error that killed the connection, if it is dead.
    pub fn cause_of_death(&self) -> Option<PeerError> {
        self.0.get().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_first_recorded_error_wins() {
        let slot = ErrorSlot::new();
        assert!(slot.cause_of_death().is_none());

        assert_eq!(
            slot.record(PeerError::ConnectionClosed),
            PeerError::ConnectionClosed
        );

        // A later racer is told the real cause.
        assert_eq!(
            slot.record(PeerError::ClientChannelClosed),
            PeerError::ConnectionClosed
        );

        assert_eq!(slot.cause_of_death(), Some(PeerError::ConnectionClosed));
    }
}
