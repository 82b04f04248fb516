//! # DAG Synchronizer
//!
//! This crate contains the [`DagSynchronizer`], which pulls block-summary
//! ancestry from a single peer until a set of target blocks is connected to
//! the locally known DAG. See the `struct` documentation for implementation
//! details.
//!
//! A sync is started with [`sync_dag`].

use futures::StreamExt;
use indexmap::IndexSet;
use tower::{Service, ServiceExt};
use tracing::instrument;

use galena_p2p_core::{
    client::Client,
    handles::{BanPeer, BanReason},
    NetworkZone, PeerRequest, PeerResponse, SummaryStream,
};
use galena_wire::{AncestorsRequest, BlockHash, BlockSummary};

mod checks;
mod constants;
mod sync_state;
mod topological;

use constants::{LONG_BAN, MEDIUM_BAN};
use sync_state::SyncState;

/// The DAG synchronizer config.
///
/// All bounds are structural, not temporal: the synchronizer carries no
/// timeouts of its own.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub struct DagSyncConfig {
    /// The maximum depth, in parent hops from the targets, the received DAG
    /// may span in one sync call.
    ///
    /// History further back must come from a later sync with newer tips.
    pub max_possible_depth: u64,
    /// The maximum growth ratio between the populations of adjacent
    /// occupied ranks.
    pub max_branching_factor: f64,
    /// The hop budget of the reachability check; also sent to the peer as
    /// the `max_depth` hint of the ancestors request.
    pub max_depth_ancestors_request: u64,
}

/// An error that occurred while syncing a peer's DAG.
#[derive(Debug, thiserror::Error)]
pub enum DagSyncError {
    /// The received DAG extends too far back from the targets.
    #[error("The received DAG is deeper than the allowed {limit} hops from the targets.")]
    TooDeep {
        /// The hashes at the level that hit the cap.
        frontier: Vec<BlockHash>,
        /// The configured depth cap.
        limit: u64,
    },
    /// A rank's population grew too fast over the previous occupied rank.
    #[error("The received DAG branches too fast: rank population grew {ratio}x, allowed {limit}x.")]
    TooWide {
        /// The first offending growth ratio, in ascending rank order.
        ratio: f64,
        /// The configured branching cap.
        limit: f64,
    },
    /// The peer sent a summary that is not an ancestor of the requested
    /// targets.
    #[error("The peer sent a summary not connected to the targets within {limit} hops.")]
    Unreachable {
        /// The offending summary.
        summary: Box<BlockSummary>,
        /// The configured hop budget.
        limit: u64,
    },
    /// The backend rejected a summary, or failed validating it.
    #[error("The backend rejected a summary: {cause}")]
    Validation {
        /// The offending summary.
        summary: Box<BlockSummary>,
        /// The backend's error.
        cause: tower::BoxError,
    },
    /// The peer was exhausted without closing the gap to the local DAG; the
    /// caller may retry later.
    #[error("The peer did not send all the dependencies of the received summaries ({} missing).", .0.len())]
    MissingDependencies(Vec<BlockHash>),
    /// A service the synchronizer relies on failed.
    #[error("Service error: {0}")]
    Service(#[from] tower::BoxError),
}

impl DagSyncError {
    /// Returns the ban this error earns the peer, or [`None`] when the
    /// error is not evidence of misbehavior.
    const fn ban(&self) -> Option<BanPeer> {
        match self {
            Self::TooDeep { .. } | Self::TooWide { .. } | Self::Unreachable { .. } => {
                Some(BanPeer {
                    duration: MEDIUM_BAN,
                    reason: BanReason::StructuralViolation,
                })
            }
            Self::Validation { .. } => Some(BanPeer {
                duration: LONG_BAN,
                reason: BanReason::InvalidData,
            }),
            Self::MissingDependencies(_) | Self::Service(_) => None,
        }
    }
}

/// The request type for the local DAG service.
pub enum DagSvcRequest {
    /// A request for the current tips of the local DAG.
    Tips,
    /// A request for the justification hashes the local DAG knows.
    Justifications,
    /// A request to validate a single summary in isolation.
    ValidateSummary(BlockSummary),
    /// A request to check whether a block is absent from the local DAG.
    IsUnknown(BlockHash),
}

/// The response type for the local DAG service.
pub enum DagSvcResponse {
    /// The response for [`DagSvcRequest::Tips`].
    Tips(Vec<BlockHash>),
    /// The response for [`DagSvcRequest::Justifications`].
    Justifications(Vec<BlockHash>),
    /// A generic ok response: the summary passed validation.
    Ok,
    /// The response for [`DagSvcRequest::IsUnknown`].
    ///
    /// `true` iff the block is *not* in the local DAG.
    IsUnknown(bool),
}

/// Syncs the DAG of a single peer.
///
/// Pulls enough ancestor summaries from `client` to connect
/// `target_block_hashes` to the DAG held behind `dag_svc`, re-requesting
/// newly discovered missing ancestors until the gap is closed, while
/// enforcing the structural bounds of `config` on everything received.
///
/// On success the summaries are returned in an order where every summary
/// comes after all of its returned dependencies. On failure no partial
/// result is returned, and a peer caught misbehaving has been banned
/// through its connection handle.
#[instrument(level = "error", skip_all, name = "dag_sync", fields(peer = %client.info.id))]
pub async fn sync_dag<Z: NetworkZone, D>(
    client: &mut Client<Z>,
    dag_svc: D,
    target_block_hashes: Vec<BlockHash>,
    config: DagSyncConfig,
) -> Result<Vec<BlockSummary>, DagSyncError>
where
    D: Service<DagSvcRequest, Response = DagSvcResponse, Error = tower::BoxError>,
{
    let res = DagSynchronizer::new(client, dag_svc, target_block_hashes, config)
        .run()
        .await;

    if let Err(e) = &res {
        tracing::warn!("Error syncing DAG: {e}");

        if let Some(ban) = e.ban() {
            client.info.handle.ban_peer(ban);
        }
    }

    res
}

/// # DAG Synchronizer
///
/// Drives one sync call against one peer.
///
/// ## Implementation Details
///
/// The sync starts by snapshotting the known frontier (our tips plus
/// justifications); the peer uses it to prune its replies and it stays
/// fixed for the whole call.
///
/// The synchronizer then asks the peer to stream the ancestry of the
/// targets. Every summary is admission checked in arrival order before it
/// is accumulated: the received DAG must stay within the configured depth,
/// its ranks must not fan out faster than the configured branching factor,
/// the summary must be connected to the targets of the running request, and
/// the backend must accept it. The first failure drops the stream, which
/// cancels the peer's producer.
///
/// A clean stream end may still leave *dangling parents*: hashes referenced
/// as dependencies whose summaries were never received. Those not already
/// in the local DAG become the targets of another stream request, repeating
/// until nothing is missing or the peer stops making progress. Gaps left at
/// that point fail the sync; otherwise the accumulated summaries are
/// returned in parent-before-child order.
struct DagSynchronizer<'a, Z: NetworkZone, D> {
    /// The connection to the peer we are syncing from.
    client: &'a mut Client<Z>,
    /// The service that holds our current DAG state.
    dag_svc: D,
    /// The targets of the sync call; the depth bound is anchored on these
    /// across all re-requests.
    original_targets: IndexSet<BlockHash>,
    /// The partial DAG received so far.
    state: SyncState,
    config: DagSyncConfig,
}

impl<'a, Z: NetworkZone, D> DagSynchronizer<'a, Z, D>
where
    D: Service<DagSvcRequest, Response = DagSvcResponse, Error = tower::BoxError>,
{
    fn new(
        client: &'a mut Client<Z>,
        dag_svc: D,
        target_block_hashes: Vec<BlockHash>,
        config: DagSyncConfig,
    ) -> Self {
        Self {
            client,
            dag_svc,
            original_targets: target_block_hashes.into_iter().collect(),
            state: SyncState::new(),
            config,
        }
    }

    async fn run(mut self) -> Result<Vec<BlockSummary>, DagSyncError> {
        // Snapshotted once; every re-request sends the same frontier.
        let known_block_hashes = self.known_frontier().await?;

        let mut targets = self.original_targets.clone();

        let missing = loop {
            let summaries_before = self.state.summary_count();

            self.sync_slice(&targets, &known_block_hashes).await?;

            let missing = self.missing_dependencies().await?;

            if missing.is_empty() || self.state.summary_count() == summaries_before {
                // Either the gap is closed, or the peer stopped making
                // progress and asking again would loop forever.
                break missing;
            }

            tracing::debug!(
                missing = missing.len(),
                "Re-requesting newly discovered missing ancestors"
            );

            targets = missing;
        };

        if !missing.is_empty() {
            return Err(DagSyncError::MissingDependencies(
                missing.into_iter().collect(),
            ));
        }

        Ok(topological::topological_order(&self.state))
    }

    /// Reads the hashes the peer may treat as "already have, do not send
    /// ancestors of": our tips plus our justifications.
    async fn known_frontier(&mut self) -> Result<Vec<BlockHash>, DagSyncError> {
        let DagSvcResponse::Tips(tips) = self
            .dag_svc
            .ready()
            .await?
            .call(DagSvcRequest::Tips)
            .await?
        else {
            panic!("DAG service returned wrong response!");
        };

        let DagSvcResponse::Justifications(justifications) = self
            .dag_svc
            .ready()
            .await?
            .call(DagSvcRequest::Justifications)
            .await?
        else {
            panic!("DAG service returned wrong response!");
        };

        let mut known = tips;
        known.extend(justifications);

        Ok(known)
    }

    /// Opens one summary stream and folds it into the state, admission
    /// checking every summary in arrival order.
    async fn sync_slice(
        &mut self,
        targets: &IndexSet<BlockHash>,
        known_block_hashes: &[BlockHash],
    ) -> Result<(), DagSyncError> {
        let mut stream = self.open_summary_stream(targets, known_block_hashes).await?;

        while let Some(summary) = stream.next().await {
            let summary = summary?;

            checks::not_too_deep(
                &self.state,
                &self.original_targets,
                self.config.max_possible_depth,
            )?;
            checks::not_too_wide(&self.state, self.config.max_branching_factor)?;
            checks::reachable(
                &self.state,
                &summary,
                targets,
                self.config.max_depth_ancestors_request,
            )?;
            self.validate(&summary).await?;

            self.state.append(summary);
        }

        // An early return above drops `stream`, closing the channel behind
        // it; the peer task stops producing as soon as it observes that.
        Ok(())
    }

    async fn open_summary_stream(
        &mut self,
        targets: &IndexSet<BlockHash>,
        known_block_hashes: &[BlockHash],
    ) -> Result<SummaryStream, DagSyncError> {
        let request = PeerRequest::AncestorSummaries(AncestorsRequest {
            target_block_hashes: targets.iter().copied().collect(),
            known_block_hashes: known_block_hashes.to_vec(),
            max_depth: self.config.max_depth_ancestors_request,
        });

        let PeerResponse::AncestorSummaries(stream) =
            self.client.ready().await?.call(request).await?;

        Ok(stream)
    }

    /// Validates a summary with the backend.
    ///
    /// Every failure, expected or not, is reclassified as
    /// [`DagSyncError::Validation`] carrying the offending summary.
    async fn validate(&mut self, summary: &BlockSummary) -> Result<(), DagSyncError> {
        let res = async {
            self.dag_svc
                .ready()
                .await?
                .call(DagSvcRequest::ValidateSummary(summary.clone()))
                .await
        }
        .await;

        match res {
            Ok(DagSvcResponse::Ok) => Ok(()),
            Ok(_) => panic!("DAG service returned wrong response!"),
            Err(cause) => Err(DagSyncError::Validation {
                summary: Box::new(summary.clone()),
                cause,
            }),
        }
    }

    /// The dangling parents that the local DAG does not have either.
    ///
    /// Queried per candidate, so ancestors we already have are pruned and
    /// the peer is never asked to resend them.
    async fn missing_dependencies(&mut self) -> Result<IndexSet<BlockHash>, DagSyncError> {
        let mut missing = IndexSet::new();

        for block_hash in self.state.dangling_parents() {
            let DagSvcResponse::IsUnknown(unknown) = self
                .dag_svc
                .ready()
                .await?
                .call(DagSvcRequest::IsUnknown(block_hash))
                .await?
            else {
                panic!("DAG service returned wrong response!");
            };

            if unknown {
                missing.insert(block_hash);
            }
        }

        Ok(missing)
    }
}
