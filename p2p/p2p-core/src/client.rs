//! The peer client service.
//!
//! A [`Client`] is the sending half of one peer connection: a
//! [`tower::Service`] that forwards [`PeerRequest`]s to the connection task
//! owning the transport and resolves to that task's [`PeerResponse`]s.

use std::{
    fmt::{Display, Formatter},
    sync::Arc,
    task::{ready, Context, Poll},
};

use futures::channel::oneshot;
use tokio::{
    sync::{mpsc, OwnedSemaphorePermit, Semaphore},
    task::JoinHandle,
};
use tokio_util::sync::{PollSemaphore, PollSender};
use tower::{Service, ServiceExt};
use tracing::Instrument;

use galena_helper::asynch::InfallibleOneshotReceiver;

use crate::{
    handles::{ConnectionGuard, ConnectionHandle},
    ConnectionDirection, ErrorSlot, NetworkZone, PeerError, PeerRequest, PeerResponse,
};

mod connection;

pub use connection::ConnectionTaskRequest;

/// An internal identifier for a peer: its address if known, or a random ID
/// for peers whose address we cannot see (inbound anonymity-network
/// connections).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum InternalPeerID<A> {
    /// A known address.
    KnownAddr(A),
    /// An unknown address.
    Unknown([u8; 16]),
}

impl<A: Display> Display for InternalPeerID<A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KnownAddr(addr) => addr.fmt(f),
            Self::Unknown(id) => write!(f, "unknown (ID: {})", hex::encode(id)),
        }
    }
}

/// Information on a connected peer.
#[derive(Debug, Clone)]
pub struct PeerInformation<A> {
    /// The internal ID of this peer.
    pub id: InternalPeerID<A>,
    /// The [`ConnectionHandle`] for this peer, which allows banning the peer
    /// and checking whether it is still connected.
    pub handle: ConnectionHandle,
    /// The direction of this connection.
    pub direction: ConnectionDirection,
}

/// A connection to a peer.
///
/// Requests sent through a [`Client`] are checked only for being the right
/// response *kind*; whether the response data is honest is for the caller to
/// decide.
pub struct Client<Z: NetworkZone> {
    /// Information on the connected peer.
    pub info: PeerInformation<Z::Addr>,

    /// The channel to the connection task.
    connection_tx: PollSender<ConnectionTaskRequest>,
    /// The [`JoinHandle`] of the connection task.
    connection_handle: JoinHandle<()>,

    /// The semaphore bounding requests in flight to this peer.
    semaphore: PollSemaphore,
    /// A permit for the semaphore, [`Some`] after `poll_ready` returned ready.
    permit: Option<OwnedSemaphorePermit>,

    /// The error slot shared with the connection task.
    error: ErrorSlot,
}

impl<Z: NetworkZone> Drop for Client<Z> {
    fn drop(&mut self) {
        self.info.handle.disconnect();
    }
}

impl<Z: NetworkZone> Client<Z> {
    /// Creates a new [`Client`] from the parts a connection task provides.
    ///
    /// The transport layer hosting the connection task is expected to call
    /// this; see [`mock_client`] for a transport-less client.
    pub fn new(
        info: PeerInformation<Z::Addr>,
        connection_tx: mpsc::Sender<ConnectionTaskRequest>,
        connection_handle: JoinHandle<()>,
        semaphore: Arc<Semaphore>,
        error: ErrorSlot,
    ) -> Self {
        Self {
            info,
            connection_tx: PollSender::new(connection_tx),
            connection_handle,
            semaphore: PollSemaphore::new(semaphore),
            permit: None,
            error,
        }
    }

    /// Checks the two ways a connection dies out from under the client: the
    /// peer disconnecting (or being banned), and the connection task
    /// exiting.
    fn liveness_error(&self) -> Option<PeerError> {
        if self.info.handle.is_closed() {
            Some(PeerError::ConnectionClosed)
        } else if self.connection_handle.is_finished() {
            Some(PeerError::ClientChannelClosed)
        } else {
            None
        }
    }

    /// Records `err` on the shared slot and returns the connection's actual
    /// cause of death, boxed for the service contract.
    fn fail(&self, err: PeerError) -> tower::BoxError {
        self.error.record(err).into()
    }
}

impl<Z: NetworkZone> Service<PeerRequest> for Client<Z> {
    type Response = PeerResponse;
    type Error = tower::BoxError;
    type Future = InfallibleOneshotReceiver<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        if let Some(err) = self.error.cause_of_death() {
            return Poll::Ready(Err(err.into()));
        }

        if let Some(err) = self.liveness_error() {
            return Poll::Ready(Err(self.fail(err)));
        }

        // Reserve a channel slot to the connection task first, then a
        // request permit. Both are held until `call`.
        if ready!(self.connection_tx.poll_reserve(cx)).is_err() {
            return Poll::Ready(Err(self.fail(PeerError::ClientChannelClosed)));
        }

        if self.permit.is_none() {
            let permit = ready!(self.semaphore.poll_acquire(cx))
                .expect("the request semaphore is never closed");

            self.permit = Some(permit);
        }

        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: PeerRequest) -> Self::Future {
        let permit = self
            .permit
            .take()
            .expect("poll_ready must succeed before a call to call");

        let (response_tx, response_rx) = oneshot::channel();

        let unsent = self
            .connection_tx
            .send_item(ConnectionTaskRequest {
                request,
                response_channel: response_tx,
                permit: Some(permit),
            })
            .err();

        if let Some(unsent) = unsent {
            // The task went away between `poll_ready` and `call`; answer the
            // request ourselves so the receiver is never left hanging.
            let err = self.fail(PeerError::ClientChannelClosed);

            let req = unsent
                .into_inner()
                .expect("send_item always hands the unsent item back");
            drop(req.response_channel.send(Err(err)));
        }

        response_rx.into()
    }
}

/// Creates a mock [`Client`] for testing.
///
/// Requests sent to the client are answered by `request_handler` instead of
/// a real peer; handler errors come back as response errors.
pub fn mock_client<Z: NetworkZone, S>(
    info: PeerInformation<Z::Addr>,
    connection_guard: ConnectionGuard,
    mut request_handler: S,
) -> Client<Z>
where
    S: Service<PeerRequest, Response = PeerResponse, Error = tower::BoxError> + Send + 'static,
    S::Future: Send + 'static,
{
    let (tx, mut rx) = mpsc::channel(1);

    let task_span = tracing::error_span!("mock_connection", addr = %info.id);

    let connection_handle = tokio::spawn(
        async move {
            let _guard = connection_guard;

            while let Some(req) = rx.recv().await {
                let ConnectionTaskRequest {
                    request,
                    response_channel,
                    permit,
                } = req;

                tracing::debug!("Handling request from the client");
                let res = match request_handler.ready().await {
                    Ok(svc) => svc.call(request).await,
                    Err(e) => Err(e),
                };

                drop(response_channel.send(res));
                drop(permit);
            }

            tracing::debug!("Client dropped, closing mock connection");
        }
        .instrument(task_span),
    );

    Client::new(
        info,
        tx,
        connection_handle,
        Arc::new(Semaphore::new(1)),
        ErrorSlot::new(),
    )
}
