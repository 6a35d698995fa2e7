// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Immutable per-row lane snapshots.

use crate::arc::ArcId;
use crate::batch::BatchRow;
use crate::ident::CommitId;

/// Lane state of one row, sealed.
///
/// `open_arcs[lane]` is the arc occupying `lane` below the row. `solved_arcs
/// [lane]` is the arc that ended on `lane` at this row.
///
/// # Invariants
///
/// - `solved_arcs` and `open_arcs` have equal length and never end with a lane
///   that is empty in both.
/// - `last_arc` is the last arc opened at `row`.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    /// Row the frame describes.
    pub row: BatchRow,
    /// Commit at that row.
    pub commit: CommitId,
    /// Lane of the commit's node.
    pub commit_lane: usize,
    /// Arcs closed at this row, by lane.
    pub solved_arcs: Vec<Option<ArcId>>,
    /// Arcs live below this row, by lane.
    pub open_arcs: Vec<Option<ArcId>>,
    /// Last arc opened at this row.
    pub last_arc: ArcId,
}

impl Frame {
    /// Seals lane vectors into a frame, normalizing their shape.
    pub fn new(
        row: BatchRow,
        commit: CommitId,
        commit_lane: usize,
        mut solved_arcs: Vec<Option<ArcId>>,
        mut open_arcs: Vec<Option<ArcId>>,
        last_arc: ArcId,
    ) -> Self {
        trim_lanes(&mut solved_arcs, &mut open_arcs);
        Self {
            row,
            commit,
            commit_lane,
            solved_arcs,
            open_arcs,
            last_arc,
        }
    }

    /// Number of lanes the frame spans.
    pub fn lane_count(&self) -> usize {
        self.open_arcs.len()
    }

    /// Open arc on `lane`.
    pub fn open_arc(&self, lane: usize) -> Option<ArcId> {
        self.open_arcs.get(lane).copied().flatten()
    }

    /// Solved arc on `lane`.
    pub fn solved_arc(&self, lane: usize) -> Option<ArcId> {
        self.solved_arcs.get(lane).copied().flatten()
    }

    /// Every arc id the frame refers to.
    pub fn arc_ids(&self) -> impl Iterator<Item = ArcId> + '_ {
        self.solved_arcs
            .iter()
            .chain(self.open_arcs.iter())
            .flatten()
            .copied()
            .chain(std::iter::once(self.last_arc))
    }

    pub(crate) fn remap_arcs(&mut self, offset: i64) {
        for slot in self.solved_arcs.iter_mut().chain(self.open_arcs.iter_mut()) {
            *slot = slot.map(|id| id.offset(offset));
        }
        self.last_arc = self.last_arc.offset(offset);
    }
}

/// Stores `value` on `lane`, growing the vector as needed.
pub(crate) fn put_lane(lanes: &mut Vec<Option<ArcId>>, lane: usize, value: Option<ArcId>) {
    if lanes.len() <= lane {
        if value.is_none() {
            return;
        }
        lanes.resize(lane + 1, None);
    }
    lanes[lane] = value;
}

/// Brings both lane vectors to a common length and drops trailing lanes that
/// are empty in both.
pub(crate) fn trim_lanes(solved: &mut Vec<Option<ArcId>>, open: &mut Vec<Option<ArcId>>) {
    let width = solved.len().max(open.len());
    solved.resize(width, None);
    open.resize(width, None);
    while matches!((solved.last(), open.last()), (Some(None), Some(None))) {
        solved.pop();
        open.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arc::{ArcList, LaneArc};
    use crate::batch::BatchAllocator;
    use crate::chain::ChainArena;
    use crate::ident::make_commit_id;

    #[test]
    fn trimming_aligns_and_drops_empty_tail() {
        let mut list = ArcList::new();
        let batch = BatchAllocator::new().reserve_new_batch();
        let row = BatchRow::new(batch, 0);
        let chain = ChainArena::new().open(row);
        let a = list.push(LaneArc {
            opened_at: row,
            closed_at: None,
            chain,
            lane: 1,
            opened_by: make_commit_id("c"),
            closed_by: make_commit_id("p"),
            junctions: Vec::new(),
        });
        let mut solved = vec![None, None, None, None];
        let mut open = vec![None];
        put_lane(&mut open, 1, Some(a));
        trim_lanes(&mut solved, &mut open);
        assert_eq!(solved, vec![None, None]);
        assert_eq!(open, vec![None, Some(a)]);

        let frame = Frame::new(row, make_commit_id("c"), 1, solved, open, a);
        assert_eq!(frame.lane_count(), 2);
        assert_eq!(frame.open_arc(1), Some(a));
        assert_eq!(frame.open_arc(7), None);
        assert_eq!(frame.arc_ids().count(), 2);
    }
}
