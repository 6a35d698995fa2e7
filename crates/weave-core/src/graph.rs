// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The lane graph: arcs, chains, keyframes and the commit row index.
//!
//! A [`Graph`] is the output of a [`GraphWeaver`](crate::GraphWeaver). It is
//! not stored as one frame per row; instead it keeps the arc list plus a
//! sparse set of keyframes and reconstructs any row's [`Frame`] by replaying
//! arcs forward from the nearest keyframe at or before it.
//!
//! # Invariants
//!
//! - Keyframes are sorted by resolved row and unique per row.
//! - Every keyframe only refers to live arcs.
//! - Row indices of the graph are contiguous, starting at 0.

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, trace};

use crate::arc::{ArcId, ArcList, LaneArc};
use crate::batch::{BatchAllocator, BatchRow, BatchShifts};
use crate::chain::{ChainArena, ChainId};
use crate::constants::DEFAULT_KEYFRAME_INTERVAL;
use crate::frame::Frame;
use crate::ident::{CommitId, CommitRecord};
use crate::playback::PlaybackState;
use crate::weaver::GraphWeaver;

/// Errors from row and commit lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The requested row is past the end of the graph.
    #[error("row {row} is not registered in the graph")]
    RowNotFound {
        /// The requested row.
        row: usize,
    },
    /// The commit has no row in the graph.
    #[error("commit {0} is not registered in the graph")]
    CommitNotFound(CommitId),
}

/// Tunables for building lane graphs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphConfig {
    /// Rows between keyframes saved while weaving.
    pub keyframe_interval: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            keyframe_interval: DEFAULT_KEYFRAME_INTERVAL,
        }
    }
}

/// Graph-independent description of one arc referenced by a frame.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ArcSummary {
    /// Lane of the arc.
    pub lane: usize,
    /// Child commit.
    pub opened_by: CommitId,
    /// Parent commit.
    pub closed_by: CommitId,
    /// Resolved opening row.
    pub opened_at: usize,
    /// Resolved closing row.
    pub closed_at: Option<usize>,
    /// Resolved top row of the arc's chain.
    pub chain_top: usize,
    /// Resolved bottom row of the arc's chain.
    pub chain_bottom: Option<usize>,
    /// Junctions as `(row, joining commit)`.
    pub junctions: Vec<(usize, CommitId)>,
}

/// Graph-independent description of a frame, comparable across graphs.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FrameSummary {
    /// Resolved row.
    pub row: usize,
    /// Commit at the row.
    pub commit: CommitId,
    /// Lane of the commit node.
    pub commit_lane: usize,
    /// Solved arcs by lane.
    pub solved: Vec<Option<ArcSummary>>,
    /// Open arcs by lane.
    pub open: Vec<Option<ArcSummary>>,
}

/// Offsets applied to a graph inserted by [`Graph::insert_front`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct FrontInsertion {
    pub(crate) arc_offset: i64,
    pub(crate) chain_offset: u32,
}

/// Lane graph for a commit sequence.
#[derive(Debug)]
pub struct Graph {
    pub(crate) arcs: ArcList,
    pub(crate) chains: ChainArena,
    pub(crate) shifts: BatchShifts,
    pub(crate) keyframes: Vec<Frame>,
    pub(crate) commit_rows: FxHashMap<CommitId, BatchRow>,
    pub(crate) allocator: BatchAllocator,
    pub(crate) config: GraphConfig,
    pub(crate) peak_arc_count: usize,
}

impl Graph {
    /// Creates an empty graph that owns no batch yet.
    pub fn new(allocator: BatchAllocator, config: GraphConfig) -> Self {
        Self {
            arcs: ArcList::new(),
            chains: ChainArena::new(),
            shifts: BatchShifts::new(),
            keyframes: Vec::new(),
            commit_rows: FxHashMap::default(),
            allocator,
            config,
            peak_arc_count: 0,
        }
    }

    /// Weaves a whole commit sequence in one call.
    pub fn build<'a>(
        commits: impl IntoIterator<Item = &'a CommitRecord>,
        allocator: &BatchAllocator,
        config: GraphConfig,
    ) -> Self {
        let mut weaver = GraphWeaver::new(allocator, config);
        for commit in commits {
            weaver.push_commit(commit.id, &commit.parents);
        }
        weaver.finish()
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// Integer row of `row` in this graph.
    pub fn resolve(&self, row: BatchRow) -> usize {
        self.shifts.resolve(row)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.commit_rows.len()
    }

    /// True when the graph has no rows.
    pub fn is_empty(&self) -> bool {
        self.commit_rows.is_empty()
    }

    /// Build settings of this graph.
    pub fn config(&self) -> GraphConfig {
        self.config
    }

    /// Arc with handle `id`.
    pub fn arc(&self, id: ArcId) -> Option<&LaneArc> {
        self.arcs.get(id)
    }

    /// Successor of `id` in list order; the first arc when `id` is `None`.
    pub fn next_arc(&self, id: Option<ArcId>) -> Option<ArcId> {
        self.arcs.next(id)
    }

    /// Iterates arcs in list order.
    pub fn arcs(&self) -> impl Iterator<Item = (ArcId, &LaneArc)> + '_ {
        self.arcs.iter()
    }

    /// Number of live arcs, placeholders included.
    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }

    /// Largest number of simultaneously open arcs seen while weaving.
    pub fn peak_arc_count(&self) -> usize {
        self.peak_arc_count
    }

    /// Resolved top row of the chain `chain` belongs to.
    pub fn chain_top(&self, chain: ChainId) -> usize {
        self.resolve(self.chains.top(chain))
    }

    /// Resolved bottom row of the chain `chain` belongs to.
    pub fn chain_bottom(&self, chain: ChainId) -> Option<usize> {
        self.chains.bottom(chain).map(|row| self.resolve(row))
    }

    /// Commit at row 0.
    pub fn head_commit(&self) -> Option<CommitId> {
        self.arcs
            .first_id()
            .and_then(|id| self.arcs.get(id))
            .map(|arc| arc.opened_by)
    }

    /// Every commit with its resolved row, in no particular order.
    pub fn commits(&self) -> impl Iterator<Item = (CommitId, usize)> + '_ {
        self.commit_rows
            .iter()
            .map(|(id, row)| (*id, self.resolve(*row)))
    }

    /// True when `commit` has a row in the graph.
    pub fn contains(&self, commit: &CommitId) -> bool {
        self.commit_rows.contains_key(commit)
    }

    /// Row of `commit`.
    pub fn get_commit_row(&self, commit: CommitId) -> Result<usize, GraphError> {
        self.commit_rows
            .get(&commit)
            .map(|row| self.resolve(*row))
            .ok_or(GraphError::CommitNotFound(commit))
    }

    /// Stored keyframes, sorted by row.
    pub fn keyframes(&self) -> &[Frame] {
        &self.keyframes
    }

    /// Number of stored keyframes.
    pub fn keyframe_count(&self) -> usize {
        self.keyframes.len()
    }

    /// Resolved rows of the stored keyframes.
    pub fn keyframe_rows(&self) -> Vec<usize> {
        self.keyframes.iter().map(|kf| self.resolve(kf.row)).collect()
    }

    /// Describes `frame` in graph-independent terms.
    pub fn frame_summary(&self, frame: &Frame) -> FrameSummary {
        let describe = |slot: &Option<ArcId>| slot.and_then(|id| self.arc_summary(id));
        FrameSummary {
            row: self.resolve(frame.row),
            commit: frame.commit,
            commit_lane: frame.commit_lane,
            solved: frame.solved_arcs.iter().map(describe).collect(),
            open: frame.open_arcs.iter().map(describe).collect(),
        }
    }

    /// Describes the arc `id` in graph-independent terms.
    pub fn arc_summary(&self, id: ArcId) -> Option<ArcSummary> {
        let arc = self.arcs.get(id)?;
        Some(ArcSummary {
            lane: arc.lane,
            opened_by: arc.opened_by,
            closed_by: arc.closed_by,
            opened_at: self.resolve(arc.opened_at),
            closed_at: arc.closed_at.map(|row| self.resolve(row)),
            chain_top: self.chain_top(arc.chain),
            chain_bottom: self.chain_bottom(arc.chain),
            junctions: arc
                .junctions
                .iter()
                .map(|j| (self.resolve(j.joined_at), j.joined_by))
                .collect(),
        })
    }

    // -------------------------------------------------------------------------
    // Keyframes and playback
    // -------------------------------------------------------------------------

    /// Stores `frame` as a keyframe. Returns false if its row already has one.
    pub fn save_keyframe(&mut self, frame: Frame) -> bool {
        let row = self.resolve(frame.row);
        match self
            .keyframes
            .binary_search_by_key(&row, |kf| self.shifts.resolve(kf.row))
        {
            Ok(existing) => {
                debug_assert_eq!(self.keyframes[existing], frame, "conflicting keyframes");
                false
            }
            Err(pos) => {
                trace!(row, "saving keyframe");
                self.keyframes.insert(pos, frame);
                true
            }
        }
    }

    /// Index of the last keyframe at or before `row`.
    pub fn get_best_keyframe_id(&self, row: usize) -> Option<usize> {
        self.keyframes
            .partition_point(|kf| self.resolve(kf.row) <= row)
            .checked_sub(1)
    }

    /// Starts playback at `goal_row`, replaying from the nearest keyframe.
    ///
    /// While replaying, keyframes are saved at growing distances from the
    /// starting point (one interval, then twice that, and so on) so repeated
    /// seeks into the same region get cheaper.
    pub fn start_playback(&mut self, goal_row: usize) -> Result<PlaybackState, GraphError> {
        if goal_row >= self.len() {
            return Err(GraphError::RowNotFound { row: goal_row });
        }
        let mut state = match self.get_best_keyframe_id(goal_row) {
            Some(index) => PlaybackState::from_keyframe(&self.keyframes[index]),
            None => PlaybackState::new(),
        };
        let start = state.row().map(|row| self.resolve(row));
        let mut next_save = self.config.keyframe_interval.max(1);
        loop {
            if let Some(row) = state.row() {
                if self.resolve(row) >= goal_row {
                    break;
                }
            }
            let row = state
                .advance_to_next_row(self)
                .map_err(|_| GraphError::RowNotFound { row: goal_row })?;
            let row = self.resolve(row);
            let travelled = start.map_or(row + 1, |start| row - start);
            if travelled >= next_save {
                if let Some(frame) = state.seal_copy() {
                    self.save_keyframe(frame);
                }
                next_save = next_save.saturating_mul(2);
            }
        }
        Ok(state)
    }

    /// Frame of `row`.
    pub fn get_frame(&mut self, row: usize) -> Result<Frame, GraphError> {
        self.start_playback(row)?
            .seal_copy()
            .ok_or(GraphError::RowNotFound { row })
    }

    /// Frame of the row holding `commit`.
    pub fn get_commit_frame(&mut self, commit: CommitId) -> Result<Frame, GraphError> {
        let row = self.get_commit_row(commit)?;
        self.get_frame(row)
    }

    // -------------------------------------------------------------------------
    // Splicing support
    // -------------------------------------------------------------------------

    /// Drops keyframes at or above `row` and keyframes that refer to arcs
    /// opened at or above `row`.
    pub fn delete_keyframes_depending_on_rows_above(&mut self, row: usize) {
        let first_kept = self
            .arcs
            .iter()
            .find(|(_, arc)| self.resolve(arc.opened_at) > row)
            .map(|(id, _)| id);
        let before = self.keyframes.len();
        let shifts = &self.shifts;
        self.keyframes.retain(|kf| {
            shifts.resolve(kf.row) > row
                && first_kept.is_some_and(|first| kf.arc_ids().all(|id| id >= first))
        });
        debug!(row, dropped = before - self.keyframes.len(), "dropped keyframes");
    }

    /// Drops every arc opened at or above `row`. Returns how many were dropped.
    pub fn delete_arcs_depending_on_rows_above(&mut self, row: usize) -> usize {
        let shifts = &self.shifts;
        self.arcs
            .truncate_front_while(|arc| shifts.resolve(arc.opened_at) <= row)
    }

    /// Removes `commits` from the row index.
    pub(crate) fn forget_commits<'a>(&mut self, commits: impl IntoIterator<Item = &'a CommitId>) {
        for commit in commits {
            self.commit_rows.remove(commit);
        }
    }

    /// Adds `delta` to every row of the graph.
    pub fn shift_batches(&mut self, delta: i64) {
        self.shifts.shift_batches(delta);
    }

    /// Frees every batch whose rows all lie at or above `row`.
    pub(crate) fn release_batches_through(&mut self, row: usize) -> usize {
        let dead = self.shifts.drain_rows_through(row);
        for batch in &dead {
            self.allocator.free_batch(*batch);
        }
        dead.len()
    }

    /// Moves all rows of `front` ahead of this graph's rows.
    ///
    /// `front`'s arcs, chains, keyframes, commits and batches become part of
    /// this graph; `front` is left empty.
    pub(crate) fn insert_front(&mut self, mut front: Graph) -> FrontInsertion {
        let chain_offset = self.chains.absorb(std::mem::take(&mut front.chains));
        let arc_offset = self
            .arcs
            .prepend(std::mem::take(&mut front.arcs), |c| c.offset(chain_offset));
        let mut keyframes = std::mem::take(&mut front.keyframes);
        for kf in &mut keyframes {
            kf.remap_arcs(arc_offset);
        }
        keyframes.append(&mut self.keyframes);
        self.keyframes = keyframes;
        self.commit_rows.extend(front.commit_rows.drain());
        self.shifts.absorb(&mut front.shifts);
        self.peak_arc_count = self.peak_arc_count.max(front.peak_arc_count);
        FrontInsertion {
            arc_offset,
            chain_offset,
        }
    }
}

impl Drop for Graph {
    fn drop(&mut self) {
        for batch in self.shifts.drain() {
            self.allocator.free_batch(batch);
        }
    }
}
