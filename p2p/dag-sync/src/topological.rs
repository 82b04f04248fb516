//! Parent-before-child emission of the synced summaries.

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};

use galena_wire::{BlockHash, BlockSummary};

use crate::sync_state::SyncState;

/// Returns the received summaries ordered so that every summary comes after
/// all of its received dependencies, each summary exactly once.
///
/// A summary is released once its last received dependency has been
/// emitted. Dependencies without a received summary are in the local DAG
/// already (the sync checked this before emitting) and count as satisfied,
/// so their children still flow through.
///
/// Summaries on a dependency cycle can never be released and are omitted;
/// content addressing makes such cycles unconstructible in practice.
pub(crate) fn topological_order(state: &SyncState) -> Vec<BlockSummary> {
    // How many of each summary's dependencies are themselves waiting to be
    // emitted. Duplicate dependencies (a parent that is also a
    // justification) are counted once, matching the child index.
    let mut pending_deps: IndexMap<BlockHash, usize> = state
        .summaries()
        .map(|(block_hash, summary)| {
            let received_deps = summary
                .dependencies()
                .filter(|dep| state.contains_summary(dep))
                .collect::<IndexSet<_>>();

            (*block_hash, received_deps.len())
        })
        .collect();

    let mut queue: VecDeque<BlockHash> = pending_deps
        .iter()
        .filter(|(_, pending)| **pending == 0)
        .map(|(block_hash, _)| *block_hash)
        .collect();

    let mut output = Vec::with_capacity(pending_deps.len());

    while let Some(block_hash) = queue.pop_front() {
        let summary = state
            .summary(&block_hash)
            .expect("only received summaries are queued");

        output.push(summary.clone());

        let Some(children) = state.children_of(&block_hash) else {
            continue;
        };

        for child in children {
            if let Some(pending) = pending_deps.get_mut(child) {
                *pending -= 1;

                if *pending == 0 {
                    queue.push_back(*child);
                }
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{hash, summary};

    fn position(output: &[BlockSummary], block_hash: BlockHash) -> usize {
        output
            .iter()
            .position(|s| s.block_hash == block_hash)
            .unwrap()
    }

    #[test]
    fn empty_state_emits_nothing() {
        assert!(topological_order(&SyncState::new()).is_empty());
    }

    #[test]
    fn diamond_emits_parents_first() {
        let mut state = SyncState::new();
        state.append(summary(hash(4), vec![hash(2), hash(3)], 2));
        state.append(summary(hash(2), vec![hash(1)], 1));
        state.append(summary(hash(3), vec![hash(1)], 1));
        state.append(summary(hash(1), vec![], 0));

        let output = topological_order(&state);

        assert_eq!(output.len(), 4);
        assert!(position(&output, hash(1)) < position(&output, hash(2)));
        assert!(position(&output, hash(1)) < position(&output, hash(3)));
        assert!(position(&output, hash(2)) < position(&output, hash(4)));
        assert!(position(&output, hash(3)) < position(&output, hash(4)));
    }

    #[test]
    fn child_waits_for_its_deepest_parent() {
        // Two roots at different depths over the same child:
        //   hash(1) <- hash(3) <- hash(4)
        //   hash(2) <----------- hash(4)
        // Flooding from the roots in FIFO order would emit hash(4) straight
        // after hash(2), before its parent hash(3).
        let mut state = SyncState::new();
        state.append(summary(hash(1), vec![], 0));
        state.append(summary(hash(2), vec![], 0));
        state.append(summary(hash(3), vec![hash(1)], 1));
        state.append(summary(hash(4), vec![hash(3), hash(2)], 2));

        let output = topological_order(&state);

        assert_eq!(output.len(), 4);
        assert!(position(&output, hash(3)) < position(&output, hash(4)));
    }

    #[test]
    fn children_of_local_blocks_flow_through() {
        // hash(9) was never received; it is in the local DAG.
        let mut state = SyncState::new();
        state.append(summary(hash(2), vec![hash(9)], 1));
        state.append(summary(hash(3), vec![hash(2)], 2));

        let output = topological_order(&state);

        assert_eq!(output.len(), 2);
        assert!(position(&output, hash(2)) < position(&output, hash(3)));
    }
}
