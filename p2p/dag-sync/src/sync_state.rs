use indexmap::{IndexMap, IndexSet};

use galena_wire::{BlockHash, BlockSummary};

/// The partial DAG built during one sync call.
///
/// The state is append-only: a key is never removed and a child set never
/// shrinks. It is created empty at the start of a sync call and discarded
/// when the call returns; it is never shared between calls.
///
/// Both maps keep insertion order so every walk over the state, and
/// therefore every result and error payload derived from one, is
/// reproducible.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct SyncState {
    /// Every summary received so far, keyed by its hash.
    summaries: IndexMap<BlockHash, BlockSummary>,
    /// The child index: a parent hash to the direct children observed so far.
    ///
    /// Keys are inserted the first time *any* summary lists them as a
    /// dependency, so a key may not have a summary yet; see
    /// [`SyncState::dangling_parents`].
    dag: IndexMap<BlockHash, IndexSet<BlockHash>>,
}

impl SyncState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a summary to the state, indexing it as a child of each of its
    /// dependencies.
    ///
    /// Idempotent: re-appending a summary leaves the state unchanged.
    pub(crate) fn append(&mut self, summary: BlockSummary) {
        for dep in summary.dependencies() {
            self.dag.entry(dep).or_default().insert(summary.block_hash);
        }

        self.summaries.insert(summary.block_hash, summary);
    }

    /// The number of summaries received so far.
    pub(crate) fn summary_count(&self) -> usize {
        self.summaries.len()
    }

    pub(crate) fn contains_summary(&self, hash: &BlockHash) -> bool {
        self.summaries.contains_key(hash)
    }

    pub(crate) fn summary(&self, hash: &BlockHash) -> Option<&BlockSummary> {
        self.summaries.get(hash)
    }

    /// The received summaries, in arrival order.
    pub(crate) fn summaries(&self) -> impl Iterator<Item = (&BlockHash, &BlockSummary)> {
        self.summaries.iter()
    }

    /// The direct children of `hash` observed so far.
    pub(crate) fn children_of(&self, hash: &BlockHash) -> Option<&IndexSet<BlockHash>> {
        self.dag.get(hash)
    }

    /// Hashes referenced as a dependency by some received summary whose own
    /// summary has not been received.
    pub(crate) fn dangling_parents(&self) -> IndexSet<BlockHash> {
        self.dag
            .keys()
            .copied()
            .filter(|hash| !self.summaries.contains_key(hash))
            .collect()
    }

    /// The in-DAG parents of a frontier: every hash with an observed child
    /// in `frontier`.
    pub(crate) fn parents_of(&self, frontier: &IndexSet<BlockHash>) -> IndexSet<BlockHash> {
        self.dag
            .iter()
            .filter(|(_, children)| !children.is_disjoint(frontier))
            .map(|(parent, _)| *parent)
            .collect()
    }
}
