// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Incremental lane assignment.
//!
//! [`GraphWeaver`] consumes commits child-before-parent and lays out one row
//! per commit:
//!
//! 1. Arcs waiting for the commit are closed. The lowest-lane one is the
//!    commit's home lane; the others free their lanes and end their chains.
//!    A commit nobody waits for starts a new chain on the leftmost free lane.
//! 2. The first parent continues the home lane and chain.
//! 3. A later parent that some open arc already waits for becomes a junction
//!    on that arc. Any other later parent opens a new chain on the leftmost
//!    free lane.
//! 4. A parentless commit records a zero-length placeholder arc and frees its
//!    home lane.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use crate::arc::{ArcId, ArcJunction, LaneArc};
use crate::batch::{BatchAllocator, BatchId, BatchRow};
use crate::chain::ChainId;
use crate::frame::{put_lane, trim_lanes, Frame};
use crate::graph::{Graph, GraphConfig};
use crate::ident::CommitId;

#[derive(Clone, Copy, Debug)]
struct CurrentRow {
    row: BatchRow,
    commit: CommitId,
    lane: usize,
}

/// Builds a [`Graph`] one commit at a time.
#[derive(Debug)]
pub struct GraphWeaver {
    graph: Graph,
    batch: BatchId,
    open_arcs: Vec<Option<ArcId>>,
    solved_arcs: Vec<Option<ArcId>>,
    lane_count: usize,
    free_lanes: BTreeSet<usize>,
    awaiting: FxHashMap<CommitId, Vec<ArcId>>,
    current: Option<CurrentRow>,
    last_arc: Option<ArcId>,
    open_count: usize,
    rows: usize,
}

impl GraphWeaver {
    /// Creates a weaver whose rows live in a fresh batch from `allocator`.
    pub fn new(allocator: &BatchAllocator, config: GraphConfig) -> Self {
        let mut graph = Graph::new(allocator.clone(), config);
        let batch = allocator.reserve_new_batch();
        graph.shifts.insert(batch, 0);
        Self {
            graph,
            batch,
            open_arcs: Vec::new(),
            solved_arcs: Vec::new(),
            lane_count: 0,
            free_lanes: BTreeSet::new(),
            awaiting: FxHashMap::default(),
            current: None,
            last_arc: None,
            open_count: 0,
            rows: 0,
        }
    }

    /// Graph built so far.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Number of rows woven so far.
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Arcs live below the current row, by lane.
    pub fn open_arcs(&self) -> &[Option<ArcId>] {
        &self.open_arcs
    }

    /// Arcs closed at the current row, by lane.
    pub fn solved_arcs(&self) -> &[Option<ArcId>] {
        &self.solved_arcs
    }

    /// Sealed copy of the current row's frame.
    pub fn frame(&self) -> Option<Frame> {
        let current = self.current?;
        Some(Frame::new(
            current.row,
            current.commit,
            current.lane,
            self.solved_arcs.clone(),
            self.open_arcs.clone(),
            self.last_arc?,
        ))
    }

    fn take_free_lane(&mut self) -> usize {
        if let Some(lane) = self.free_lanes.pop_first() {
            return lane;
        }
        let lane = self.lane_count;
        self.lane_count += 1;
        lane
    }

    fn lane_of(&self, id: ArcId) -> usize {
        self.graph.arcs.get(id).map_or(usize::MAX, |arc| arc.lane)
    }

    fn open_arc(
        &mut self,
        row: BatchRow,
        child: CommitId,
        parent: CommitId,
        lane: usize,
        chain: ChainId,
    ) -> ArcId {
        let id = self.graph.arcs.push(LaneArc {
            opened_at: row,
            closed_at: None,
            chain,
            lane,
            opened_by: child,
            closed_by: parent,
            junctions: Vec::new(),
        });
        put_lane(&mut self.open_arcs, lane, Some(id));
        self.awaiting.entry(parent).or_default().push(id);
        self.open_count += 1;
        self.last_arc = Some(id);
        id
    }

    /// Adds the next commit of the sequence. Returns its row.
    pub fn push_commit(&mut self, commit: CommitId, parents: &[CommitId]) -> BatchRow {
        let row = self.graph.shifts.next_row(self.batch);
        for slot in &mut self.solved_arcs {
            *slot = None;
        }

        let mut closing = self.awaiting.remove(&commit).unwrap_or_default();
        closing.sort_by_key(|id| self.lane_of(*id));
        let home = closing
            .first()
            .and_then(|first| self.graph.arcs.get(*first))
            .map(|arc| (arc.lane, arc.chain));
        let (home_lane, home_chain) = match home {
            Some(home) => home,
            None => {
                let lane = self.take_free_lane();
                (lane, self.graph.chains.open(row))
            }
        };

        for id in closing {
            let Some(arc) = self.graph.arcs.get_mut(id) else {
                continue;
            };
            arc.closed_at = Some(row);
            let (lane, chain) = (arc.lane, arc.chain);
            put_lane(&mut self.open_arcs, lane, None);
            put_lane(&mut self.solved_arcs, lane, Some(id));
            self.open_count -= 1;
            if lane != home_lane {
                self.free_lanes.insert(lane);
                self.graph.chains.close(chain, row);
            }
        }

        for (index, parent) in parents.iter().enumerate() {
            if index == 0 {
                self.open_arc(row, commit, *parent, home_lane, home_chain);
                continue;
            }
            let joined = self.awaiting.get(parent).and_then(|ids| {
                ids.iter().copied().min_by_key(|id| self.lane_of(*id))
            });
            if let Some(target) = joined {
                trace!(%commit, %parent, "junction");
                if let Some(arc) = self.graph.arcs.get_mut(target) {
                    arc.junctions.push(ArcJunction {
                        joined_at: row,
                        joined_by: commit,
                    });
                }
                continue;
            }
            let lane = self.take_free_lane();
            let chain = self.graph.chains.open(row);
            self.open_arc(row, commit, *parent, lane, chain);
        }

        if parents.is_empty() {
            let id = self.graph.arcs.push(LaneArc {
                opened_at: row,
                closed_at: Some(row),
                chain: home_chain,
                lane: home_lane,
                opened_by: commit,
                closed_by: commit,
                junctions: Vec::new(),
            });
            self.last_arc = Some(id);
            self.graph.chains.close(home_chain, row);
            self.free_lanes.insert(home_lane);
        }

        trim_lanes(&mut self.solved_arcs, &mut self.open_arcs);
        self.graph.peak_arc_count = self.graph.peak_arc_count.max(self.open_count);
        let repeated = self.graph.commit_rows.insert(commit, row).is_some();
        debug_assert!(!repeated, "commit {commit} appeared twice in the sequence");
        if repeated {
            warn!(%commit, "commit appeared twice in the sequence; row count is off");
        }
        self.current = Some(CurrentRow {
            row,
            commit,
            lane: home_lane,
        });

        let index = self.rows;
        self.rows += 1;
        if index > 0 && index % self.graph.config.keyframe_interval.max(1) == 0 {
            if let Some(frame) = self.frame() {
                self.graph.save_keyframe(frame);
            }
        }
        row
    }

    /// Finishes weaving and yields the graph.
    pub fn finish(self) -> Graph {
        self.graph
    }
}
