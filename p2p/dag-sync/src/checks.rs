//! The admission checks.
//!
//! Each check is a pure predicate over the current [`SyncState`], run for
//! every summary the peer streams, *before* that summary is appended. They
//! are what stops a malicious peer from dragging us arbitrarily deep into
//! history, fanning the DAG out or padding the stream with unrelated
//! summaries.

use std::collections::BTreeMap;

use indexmap::IndexSet;

use galena_wire::{BlockHash, BlockSummary};

use crate::{sync_state::SyncState, DagSyncError};

/// Checks that the received DAG does not extend further than
/// `max_possible_depth` parent hops from the original targets of the sync
/// call.
///
/// Walks the state's own child index level by level; an empty level within
/// the budget accepts, a non-empty level at the budget fails.
pub(crate) fn not_too_deep(
    state: &SyncState,
    original_targets: &IndexSet<BlockHash>,
    max_possible_depth: u64,
) -> Result<(), DagSyncError> {
    let mut frontier = original_targets.clone();

    for depth in 1..=max_possible_depth {
        frontier = state.parents_of(&frontier);

        if frontier.is_empty() {
            return Ok(());
        }

        if depth == max_possible_depth {
            return Err(DagSyncError::TooDeep {
                frontier: frontier.into_iter().collect(),
                limit: max_possible_depth,
            });
        }
    }

    Ok(())
}

/// Checks that no rank's population grew more than `max_branching_factor`
/// times over the previous *occupied* rank.
///
/// Adjacent pairs are taken in sorted rank order, not by rank-value
/// adjacency, so skipped ranks do not disable the check. A ratio exactly
/// equal to the limit is allowed.
pub(crate) fn not_too_wide(
    state: &SyncState,
    max_branching_factor: f64,
) -> Result<(), DagSyncError> {
    let mut rank_counts = BTreeMap::<u64, usize>::new();
    for (_, summary) in state.summaries() {
        *rank_counts.entry(summary.rank()).or_default() += 1;
    }

    for (prev, next) in rank_counts.values().zip(rank_counts.values().skip(1)) {
        let ratio = *next as f64 / *prev as f64;

        if ratio > max_branching_factor {
            return Err(DagSyncError::TooWide {
                ratio,
                limit: max_branching_factor,
            });
        }
    }

    Ok(())
}

/// Checks that `summary` is an ancestor of the current request's targets,
/// within `max_depth_ancestors_request` hops of the edges observed so far.
///
/// The summary has not been appended yet, so it cannot satisfy the check by
/// its own edges: only previously received descendants connect it. A hit
/// exactly at the hop budget is accepted.
pub(crate) fn reachable(
    state: &SyncState,
    summary: &BlockSummary,
    request_targets: &IndexSet<BlockHash>,
    max_depth_ancestors_request: u64,
) -> Result<(), DagSyncError> {
    let unreachable = || DagSyncError::Unreachable {
        summary: Box::new(summary.clone()),
        limit: max_depth_ancestors_request,
    };

    let mut frontier = request_targets.clone();

    if frontier.contains(&summary.block_hash) {
        return Ok(());
    }

    for _ in 1..=max_depth_ancestors_request {
        frontier = state.parents_of(&frontier);

        if frontier.contains(&summary.block_hash) {
            return Ok(());
        }

        if frontier.is_empty() {
            return Err(unreachable());
        }
    }

    Err(unreachable())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{hash, summary};

    /// A chain `hash(1) <- hash(2) <- ... <- hash(len)`, fully received.
    fn chain_state(len: u64) -> SyncState {
        let mut state = SyncState::new();
        for n in 1..=len {
            let parents = if n == 1 { vec![] } else { vec![hash(n - 1)] };
            state.append(summary(hash(n), parents, n));
        }
        state
    }

    #[test]
    fn depth_below_the_limit_is_accepted() {
        // 3 hops of received history from the target.
        let state = chain_state(4);
        let targets = IndexSet::from([hash(4)]);

        assert!(not_too_deep(&state, &targets, 4).is_ok());
    }

    #[test]
    fn depth_at_the_limit_is_rejected() {
        let state = chain_state(4);
        let targets = IndexSet::from([hash(4)]);

        let Err(DagSyncError::TooDeep { frontier, limit }) = not_too_deep(&state, &targets, 3)
        else {
            panic!("expected TooDeep");
        };

        assert_eq!(frontier, [hash(1)]);
        assert_eq!(limit, 3);
    }

    #[test]
    fn width_at_the_limit_is_accepted() {
        let mut state = SyncState::new();
        state.append(summary(hash(1), vec![], 10));
        state.append(summary(hash(2), vec![hash(1)], 11));
        state.append(summary(hash(3), vec![hash(1)], 11));

        assert!(not_too_wide(&state, 2.0).is_ok());
    }

    #[test]
    fn width_over_the_limit_is_rejected() {
        let mut state = SyncState::new();
        state.append(summary(hash(1), vec![], 10));
        state.append(summary(hash(2), vec![], 10));
        for n in 3..=7 {
            state.append(summary(hash(n), vec![hash(1)], 11));
        }

        let Err(DagSyncError::TooWide { ratio, limit }) = not_too_wide(&state, 2.0) else {
            panic!("expected TooWide");
        };

        assert_eq!(ratio, 2.5);
        assert_eq!(limit, 2.0);
    }

    #[test]
    fn first_offending_ratio_is_reported() {
        let mut state = SyncState::new();
        state.append(summary(hash(1), vec![], 0));
        for n in 2..=4 {
            state.append(summary(hash(n), vec![hash(1)], 1));
        }
        for n in 5..=16 {
            state.append(summary(hash(n), vec![hash(2)], 2));
        }

        // Populations are [1, 3, 12]; both ratios offend, the lower-rank one
        // is reported.
        let Err(DagSyncError::TooWide { ratio, .. }) = not_too_wide(&state, 2.0) else {
            panic!("expected TooWide");
        };

        assert_eq!(ratio, 3.0);
    }

    #[test]
    fn skipped_ranks_do_not_disable_the_width_check() {
        let mut state = SyncState::new();
        state.append(summary(hash(1), vec![], 0));
        for n in 2..=4 {
            state.append(summary(hash(n), vec![hash(1)], 40));
        }

        assert!(matches!(
            not_too_wide(&state, 2.0),
            Err(DagSyncError::TooWide { .. })
        ));
    }

    #[test]
    fn reachability_hit_at_the_hop_limit_is_accepted() {
        // State holds hash(2)..hash(4); candidate hash(1) sits 3 hops from
        // the target.
        let mut state = SyncState::new();
        state.append(summary(hash(4), vec![hash(3)], 4));
        state.append(summary(hash(3), vec![hash(2)], 3));
        state.append(summary(hash(2), vec![hash(1)], 2));

        let candidate = summary(hash(1), vec![], 1);
        let targets = IndexSet::from([hash(4)]);

        assert!(reachable(&state, &candidate, &targets, 3).is_ok());
    }

    #[test]
    fn reachability_beyond_the_hop_limit_is_rejected() {
        let mut state = SyncState::new();
        state.append(summary(hash(4), vec![hash(3)], 4));
        state.append(summary(hash(3), vec![hash(2)], 3));
        state.append(summary(hash(2), vec![hash(1)], 2));

        let candidate = summary(hash(1), vec![], 1);
        let targets = IndexSet::from([hash(4)]);

        let Err(DagSyncError::Unreachable { summary, limit }) =
            reachable(&state, &candidate, &targets, 2)
        else {
            panic!("expected Unreachable");
        };

        assert_eq!(summary.block_hash, hash(1));
        assert_eq!(limit, 2);
    }

    #[test]
    fn disconnected_summary_is_rejected_early() {
        let mut state = SyncState::new();
        state.append(summary(hash(2), vec![hash(1)], 2));

        // Nothing links hash(66) to the target; the walk dies out after the
        // dangling parent level.
        let stray = summary(hash(66), vec![hash(65)], 2);
        let targets = IndexSet::from([hash(2)]);

        assert!(matches!(
            reachable(&state, &stray, &targets, 50),
            Err(DagSyncError::Unreachable { .. })
        ));
    }

    #[test]
    fn a_target_summary_is_reachable_at_hop_zero() {
        let state = SyncState::new();
        let candidate = summary(hash(1), vec![], 1);
        let targets = IndexSet::from([hash(1)]);

        assert!(reachable(&state, &candidate, &targets, 1).is_ok());
    }
}
