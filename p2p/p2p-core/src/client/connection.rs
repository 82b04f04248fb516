//! The channel protocol between a [`Client`](crate::client::Client) and its
//! connection task.

use futures::channel::oneshot;
use tokio::sync::OwnedSemaphorePermit;

use crate::{PeerRequest, PeerResponse};

/// One request travelling from a [`Client`](crate::client::Client) to the
/// connection task that owns the transport.
pub struct ConnectionTaskRequest {
    /// The request to send to the peer.
    pub request: PeerRequest,
    /// The channel the response is sent back on.
    ///
    /// The connection task must always send a response, even on failure.
    pub response_channel: oneshot::Sender<Result<PeerResponse, tower::BoxError>>,
    /// The client's in-flight permit; dropped when the request is done.
    pub permit: Option<OwnedSemaphorePermit>,
}
