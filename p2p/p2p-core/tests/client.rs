use std::net::SocketAddr;

use futures::{stream, StreamExt};
use tower::{service_fn, Service, ServiceExt};

use galena_p2p_core::{
    client::{mock_client, InternalPeerID, PeerInformation},
    handles::new_connection,
    ClearNet, ConnectionDirection, PeerRequest, PeerResponse,
};
use galena_wire::{AncestorsRequest, BlockSummary, SummaryHeader};

fn summary(n: u8) -> BlockSummary {
    BlockSummary {
        block_hash: [n; 32],
        parent_hashes: vec![],
        justifications: vec![],
        header: SummaryHeader {
            rank: 0,
            timestamp_ms: 0,
        },
    }
}

#[tokio::test]
async fn mock_client_answers_ancestor_requests() {
    let (guard, handle) = new_connection(None);

    let request_handler = service_fn(|req: PeerRequest| async move {
        let PeerRequest::AncestorSummaries(req) = req;
        assert_eq!(req.max_depth, 5);

        let stream = stream::iter(vec![
            Ok::<_, tower::BoxError>(summary(1)),
            Ok(summary(2)),
        ])
        .boxed();

        Ok::<_, tower::BoxError>(PeerResponse::AncestorSummaries(stream))
    });

    let info = PeerInformation {
        id: InternalPeerID::KnownAddr("127.0.0.1:18081".parse::<SocketAddr>().unwrap()),
        handle,
        direction: ConnectionDirection::Outbound,
    };

    let mut client = mock_client::<ClearNet, _>(info, guard, request_handler);

    let request = PeerRequest::AncestorSummaries(AncestorsRequest {
        target_block_hashes: vec![[1; 32]],
        known_block_hashes: vec![],
        max_depth: 5,
    });

    let PeerResponse::AncestorSummaries(stream) =
        client.ready().await.unwrap().call(request).await.unwrap();

    let received = stream
        .map(|res| res.unwrap())
        .collect::<Vec<BlockSummary>>()
        .await;

    assert_eq!(received, [summary(1), summary(2)]);
}
