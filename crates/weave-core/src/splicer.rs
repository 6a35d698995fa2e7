// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Incremental refresh of a lane graph.
//!
//! When a repository's refs move, most of the history below the moved refs is
//! unchanged. [`GraphSplicer`] weaves the new commit sequence from the top
//! while replaying the old graph alongside it. As soon as both sides sit on
//! the same commit with the same lane occupancy, and every head that differs
//! between the two ref sets has been seen, the rest of the old graph is still
//! valid. That point is the equilibrium: the new prefix is kept, the old
//! graph's rows above its equilibrium row are dropped, and the two are
//! stitched together lane by lane.
//!
//! Without an equilibrium the newly woven graph replaces the old one.

use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::arc::{ArcId, ArcJunction};
use crate::batch::{BatchAllocator, BatchRow};
use crate::chain::ChainId;
use crate::graph::{Graph, GraphConfig};
use crate::ident::{CommitId, CommitRecord};
use crate::playback::{PlaybackExhausted, PlaybackState};
use crate::weaver::GraphWeaver;

/// Result of feeding one commit to a splicer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpliceStep {
    /// No equilibrium yet.
    KeepFeeding,
    /// Equilibrium found; further commits are not needed.
    Equilibrium,
}

/// Matching rows of the new prefix and the old graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Equilibrium {
    /// Row in the new sequence.
    pub new_row: usize,
    /// Row in the old graph.
    pub old_row: usize,
}

/// Result of a finished splice.
#[derive(Debug)]
pub struct SpliceOutcome {
    /// The refreshed graph.
    pub graph: Graph,
    /// Where the graphs were joined; `None` when the old graph was replaced.
    pub equilibrium: Option<Equilibrium>,
    /// Rows present now that were not there before.
    pub rows_added: usize,
    /// Rows that were there before and are gone now.
    pub rows_removed: usize,
    /// Commits whose rows were removed.
    pub removed_commits: Vec<CommitId>,
}

/// An old arc open across the old equilibrium row, captured before the old
/// rows above it are discarded.
#[derive(Debug)]
struct SeamArc {
    new_arc: ArcId,
    closed_at: Option<BatchRow>,
    old_chain: ChainId,
    junctions: Vec<ArcJunction>,
}

/// Splices a new commit sequence onto an existing graph.
#[derive(Debug)]
pub struct GraphSplicer {
    old: Graph,
    old_playback: PlaybackState,
    old_exhausted: bool,
    old_passed: Vec<CommitId>,
    weaver: GraphWeaver,
    new_commits: Vec<CommitId>,
    required_new: FxHashSet<CommitId>,
    required_old: FxHashSet<CommitId>,
    equilibrium: Option<Equilibrium>,
}

impl GraphSplicer {
    /// Starts a splice of a new sequence onto `old_graph`.
    ///
    /// Heads present in only one of the two sets must be passed on their side
    /// before an equilibrium can be declared.
    pub fn new(
        old_graph: Graph,
        old_heads: impl IntoIterator<Item = CommitId>,
        new_heads: impl IntoIterator<Item = CommitId>,
        allocator: &BatchAllocator,
        config: GraphConfig,
    ) -> Self {
        let old_heads: FxHashSet<CommitId> = old_heads.into_iter().collect();
        let new_heads: FxHashSet<CommitId> = new_heads.into_iter().collect();
        let required_new = new_heads.difference(&old_heads).copied().collect();
        let required_old = old_heads
            .difference(&new_heads)
            .filter(|head| old_graph.contains(head))
            .copied()
            .collect();
        Self {
            old: old_graph,
            old_playback: PlaybackState::new(),
            old_exhausted: false,
            old_passed: Vec::new(),
            weaver: GraphWeaver::new(allocator, config),
            new_commits: Vec::new(),
            required_new,
            required_old,
            equilibrium: None,
        }
    }

    /// The graph being refreshed. Stays readable until the splice finishes.
    pub fn old_graph(&self) -> &Graph {
        &self.old
    }

    /// The new prefix woven so far.
    pub fn new_graph(&self) -> &Graph {
        self.weaver.graph()
    }

    /// Equilibrium, once found.
    pub fn equilibrium(&self) -> Option<Equilibrium> {
        self.equilibrium
    }

    /// Feeds the next commit of the new sequence.
    pub fn splice_new_commit(&mut self, commit: &CommitRecord) -> SpliceStep {
        if self.equilibrium.is_some() {
            return SpliceStep::Equilibrium;
        }
        self.weaver.push_commit(commit.id, &commit.parents);
        self.new_commits.push(commit.id);
        self.required_new.remove(&commit.id);
        if self.old_exhausted {
            return SpliceStep::KeepFeeding;
        }

        let Ok(old_row) = self.old.get_commit_row(commit.id) else {
            return SpliceStep::KeepFeeding;
        };
        let current = self.old_playback.row().map(|row| self.old.resolve(row));
        if current.is_some_and(|current| old_row < current) {
            return SpliceStep::KeepFeeding;
        }
        if current != Some(old_row) {
            match self.old_playback.advance_to_commit(&self.old, commit.id) {
                Ok(entered) => {
                    for passed in entered {
                        self.required_old.remove(&passed);
                        self.old_passed.push(passed);
                    }
                }
                Err(PlaybackExhausted) => {
                    self.old_exhausted = true;
                    return SpliceStep::KeepFeeding;
                }
            }
        }

        if self.required_new.is_empty() && self.required_old.is_empty() && self.lanes_match() {
            let found = Equilibrium {
                new_row: self.weaver.row_count() - 1,
                old_row,
            };
            debug!(
                new_row = found.new_row,
                old_row = found.old_row,
                commit = %commit.id,
                "splice equilibrium"
            );
            self.equilibrium = Some(found);
            return SpliceStep::Equilibrium;
        }
        SpliceStep::KeepFeeding
    }

    /// True when every lane holds equivalent arcs on both sides.
    fn lanes_match(&self) -> bool {
        let new_graph = self.weaver.graph();
        let new_row = self.weaver.row_count() - 1;
        let old_row = self
            .old_playback
            .row()
            .map_or(0, |row| self.old.resolve(row));
        let new_open = self.weaver.open_arcs();
        let old_open = self.old_playback.open_arcs();
        (0..new_open.len().max(old_open.len())).all(|lane| {
            let new_arc = new_open
                .get(lane)
                .copied()
                .flatten()
                .and_then(|id| new_graph.arc(id))
                .filter(|arc| !arc.is_stale(new_row, &new_graph.shifts));
            let old_arc = old_open
                .get(lane)
                .copied()
                .flatten()
                .and_then(|id| self.old.arc(id))
                .filter(|arc| !arc.is_stale(old_row, &self.old.shifts));
            match (new_arc, old_arc) {
                (None, None) => true,
                (Some(a), Some(b)) => a.opened_by == b.opened_by && a.closed_by == b.closed_by,
                _ => false,
            }
        })
    }

    /// Gives back the old graph untouched, discarding the new prefix.
    pub fn abandon(self) -> Graph {
        self.old
    }

    /// Completes the splice.
    pub fn finish(self) -> SpliceOutcome {
        let Self {
            old,
            old_playback,
            old_passed,
            weaver,
            new_commits,
            equilibrium,
            ..
        } = self;

        let Some(found) = equilibrium else {
            let graph = weaver.finish();
            let rows_added = new_commits.iter().filter(|c| !old.contains(c)).count();
            let mut removed_commits: Vec<(usize, CommitId)> = old
                .commits()
                .filter(|(commit, _)| !graph.contains(commit))
                .map(|(commit, row)| (row, commit))
                .collect();
            removed_commits.sort_unstable();
            debug!(
                rows = graph.len(),
                rows_added,
                rows_removed = removed_commits.len(),
                "no splice equilibrium; replacing graph"
            );
            return SpliceOutcome {
                graph,
                equilibrium: None,
                rows_added,
                rows_removed: removed_commits.len(),
                removed_commits: removed_commits.into_iter().map(|(_, c)| c).collect(),
            };
        };

        let mut merged = old;
        let seams = collect_seams(&merged, &weaver, &old_playback, found.old_row);
        let new_graph = weaver.finish();

        let new_prefix: FxHashSet<CommitId> = new_commits.iter().copied().collect();
        let passed: FxHashSet<CommitId> = old_passed.iter().copied().collect();
        let rows_added = new_commits.iter().filter(|c| !passed.contains(c)).count();
        let removed_commits: Vec<CommitId> = old_passed
            .iter()
            .filter(|c| !new_prefix.contains(c))
            .copied()
            .collect();

        merged.delete_keyframes_depending_on_rows_above(found.old_row);
        let dropped_arcs = merged.delete_arcs_depending_on_rows_above(found.old_row);
        merged.forget_commits(&old_passed);
        let released = merged.release_batches_through(found.old_row);
        let delta = i64::try_from(found.new_row).unwrap_or(i64::MAX)
            - i64::try_from(found.old_row).unwrap_or(i64::MAX);
        merged.shift_batches(delta);
        trace!(dropped_arcs, released, delta, "trimmed old graph above equilibrium");

        let inserted = merged.insert_front(new_graph);
        for seam in seams {
            let id = seam.new_arc.offset(inserted.arc_offset);
            let Some(arc) = merged.arcs.get_mut(id) else {
                continue;
            };
            arc.closed_at = seam.closed_at;
            arc.junctions.extend(seam.junctions);
            let new_chain = arc.chain;
            merged.chains.transplant_bottom(seam.old_chain, new_chain);
            merged.chains.alias(seam.old_chain, new_chain);
        }
        merged.chains.compress_all();

        debug!(
            rows = merged.len(),
            rows_added,
            rows_removed = removed_commits.len(),
            "spliced graph"
        );
        SpliceOutcome {
            graph: merged,
            equilibrium: Some(found),
            rows_added,
            rows_removed: removed_commits.len(),
            removed_commits,
        }
    }
}

/// Pairs the new prefix's open arcs with the old graph's open arcs at the
/// equilibrium, copying what must survive the old graph's truncation.
fn collect_seams(
    old: &Graph,
    weaver: &GraphWeaver,
    old_playback: &PlaybackState,
    old_row: usize,
) -> Vec<SeamArc> {
    let new_open = weaver.open_arcs();
    let old_open = old_playback.open_arcs();
    let mut seams = Vec::new();
    for (lane, new_slot) in new_open.iter().enumerate() {
        let (Some(new_arc), Some(old_id)) = (*new_slot, old_open.get(lane).copied().flatten())
        else {
            continue;
        };
        let Some(old_arc) = old.arc(old_id) else {
            continue;
        };
        seams.push(SeamArc {
            new_arc,
            closed_at: old_arc.closed_at,
            old_chain: old.chains.resolve(old_arc.chain),
            junctions: old_arc
                .junctions
                .iter()
                .filter(|j| old.resolve(j.joined_at) > old_row)
                .copied()
                .collect(),
        });
    }
    seams
}
