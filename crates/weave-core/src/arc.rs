// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Lane arcs and the ordered arc list of a graph.
//!
//! An arc is a vertical line on one lane running from the child commit that
//! opened it down to the parent commit that closes it. Arcs are stored in the
//! order their opening rows appear, which is the order playback consumes them.
//!
//! # Invariants
//!
//! - List order is non-decreasing in `opened_at` (resolved).
//! - An [`ArcId`] never changes while its arc is alive: dropping a prefix of
//!   the list or prepending arcs in front of it leaves surviving ids intact.
//! - Junctions of an arc are ordered by row.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::batch::{BatchRow, BatchShifts};
use crate::chain::ChainId;
use crate::ident::CommitId;

/// Stable handle of an arc within one graph.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArcId(i64);

impl ArcId {
    pub(crate) const fn offset(self, by: i64) -> Self {
        Self(self.0 + by)
    }
}

/// Point where a further child of an arc's closing commit joins the arc.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArcJunction {
    /// Row of the joining commit.
    pub joined_at: BatchRow,
    /// The joining commit.
    pub joined_by: CommitId,
}

/// One arc of the lane graph.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaneArc {
    /// Row of the child commit that opened the arc.
    pub opened_at: BatchRow,
    /// Row of the parent commit that closed the arc, once it has been seen.
    pub closed_at: Option<BatchRow>,
    /// Chain the arc belongs to.
    pub chain: ChainId,
    /// Lane the arc occupies.
    pub lane: usize,
    /// Child commit.
    pub opened_by: CommitId,
    /// Parent commit the arc is waiting for.
    pub closed_by: CommitId,
    /// Further children of `closed_by` that merge into this arc.
    pub junctions: Vec<ArcJunction>,
}

impl LaneArc {
    /// True for the zero-length arc recorded for a parentless commit.
    pub fn is_placeholder(&self) -> bool {
        self.opened_by == self.closed_by
    }

    /// True while the parent has not been seen in this graph.
    pub fn is_dangling(&self) -> bool {
        self.closed_at.is_none()
    }

    /// True when this arc can no longer occupy its lane at `row`.
    ///
    /// A closed arc is stale at every row at or below its closing row. A
    /// placeholder is stale from its own row on. A dangling arc stays live to
    /// the bottom of history.
    pub fn is_stale(&self, row: usize, shifts: &BatchShifts) -> bool {
        if self.is_placeholder() {
            return shifts.resolve(self.opened_at) <= row;
        }
        self.closed_at
            .is_some_and(|closed| shifts.resolve(closed) <= row)
    }

    /// True when the arc should be drawn at `row` given a set of hidden commits.
    ///
    /// An arc into a hidden parent is never drawn. An arc whose child is hidden
    /// is still drawn once a visible commit has joined it at or above `row`.
    pub fn is_visible(
        &self,
        hidden: Option<&FxHashSet<CommitId>>,
        row: usize,
        shifts: &BatchShifts,
    ) -> bool {
        let Some(hidden) = hidden else {
            return true;
        };
        if hidden.contains(&self.closed_by) {
            return false;
        }
        if !hidden.contains(&self.opened_by) {
            return true;
        }
        self.junctions
            .iter()
            .any(|j| shifts.resolve(j.joined_at) <= row && !hidden.contains(&j.joined_by))
    }

    /// Number of rows the arc spans, if it is closed.
    pub fn length(&self, shifts: &BatchShifts) -> Option<usize> {
        let closed = shifts.try_resolve(self.closed_at?)?;
        let opened = shifts.try_resolve(self.opened_at)?;
        closed.checked_sub(opened)
    }
}

/// Arcs of a graph in list order, addressed by stable [`ArcId`]s.
#[derive(Clone, Debug, Default)]
pub struct ArcList {
    arcs: VecDeque<LaneArc>,
    base: i64,
}

impl ArcList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&self, id: ArcId) -> Option<usize> {
        usize::try_from(id.0 - self.base)
            .ok()
            .filter(|index| *index < self.arcs.len())
    }

    fn id_at(&self, index: usize) -> ArcId {
        ArcId(self.base + i64::try_from(index).unwrap_or(i64::MAX))
    }

    /// Appends `arc` to the end of the list.
    pub fn push(&mut self, arc: LaneArc) -> ArcId {
        self.arcs.push_back(arc);
        self.id_at(self.arcs.len() - 1)
    }

    /// Arc with handle `id`, if alive.
    pub fn get(&self, id: ArcId) -> Option<&LaneArc> {
        self.arcs.get(self.index(id)?)
    }

    /// Mutable arc with handle `id`, if alive.
    pub fn get_mut(&mut self, id: ArcId) -> Option<&mut LaneArc> {
        let index = self.index(id)?;
        self.arcs.get_mut(index)
    }

    /// True when `id` refers to a live arc.
    pub fn contains(&self, id: ArcId) -> bool {
        self.index(id).is_some()
    }

    /// Arc following `id`; the head of the list when `id` is `None`.
    pub fn next(&self, id: Option<ArcId>) -> Option<ArcId> {
        let next = match id {
            None => ArcId(self.base),
            Some(id) => ArcId(id.0 + 1),
        };
        self.index(next).map(|_| next)
    }

    /// Handle of the first arc, if any.
    pub fn first_id(&self) -> Option<ArcId> {
        self.next(None)
    }

    /// Handle of the last arc, if any.
    pub fn last_id(&self) -> Option<ArcId> {
        self.arcs.len().checked_sub(1).map(|index| self.id_at(index))
    }

    /// Iterates arcs in list order together with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (ArcId, &LaneArc)> + '_ {
        self.arcs
            .iter()
            .enumerate()
            .map(move |(index, arc)| (self.id_at(index), arc))
    }

    /// Number of live arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// True when the list holds no arc.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Drops every arc from the head of the list while `dead` holds.
    pub(crate) fn truncate_front_while(&mut self, mut dead: impl FnMut(&LaneArc) -> bool) -> usize {
        let mut removed = 0;
        while self.arcs.front().is_some_and(&mut dead) {
            self.arcs.pop_front();
            self.base += 1;
            removed += 1;
        }
        removed
    }

    /// Puts every arc of `front` ahead of this list, mapping chain ids through
    /// `remap_chain`. Returns the offset added to `front`'s arc ids.
    pub(crate) fn prepend(
        &mut self,
        mut front: ArcList,
        remap_chain: impl Fn(ChainId) -> ChainId,
    ) -> i64 {
        let count = i64::try_from(front.arcs.len()).unwrap_or(i64::MAX);
        let new_base = self.base - count;
        let offset = new_base - front.base;
        while let Some(mut arc) = front.arcs.pop_back() {
            arc.chain = remap_chain(arc.chain);
            self.arcs.push_front(arc);
        }
        self.base = new_base;
        offset
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::batch::BatchAllocator;
    use crate::chain::ChainArena;
    use crate::ident::make_commit_id;

    fn arc(row: BatchRow, chain: ChainId, from: &str, to: &str) -> LaneArc {
        LaneArc {
            opened_at: row,
            closed_at: None,
            chain,
            lane: 0,
            opened_by: make_commit_id(from),
            closed_by: make_commit_id(to),
            junctions: Vec::new(),
        }
    }

    #[test]
    fn ids_survive_truncation_and_prepend() {
        let alloc = BatchAllocator::new();
        let batch = alloc.reserve_new_batch();
        let mut shifts = BatchShifts::new();
        shifts.insert(batch, 0);
        let mut chains = ChainArena::new();
        let chain = chains.open(BatchRow::new(batch, 0));

        let mut list = ArcList::new();
        let ids: Vec<ArcId> = (0..4)
            .map(|i| list.push(arc(BatchRow::new(batch, i), chain, "c", "p")))
            .collect();
        let removed = list.truncate_front_while(|a| shifts.resolve(a.opened_at) <= 1);
        assert_eq!(removed, 2);
        assert!(!list.contains(ids[1]));
        assert_eq!(list.get(ids[2]).unwrap().opened_at, BatchRow::new(batch, 2));

        let mut front = ArcList::new();
        let f0 = front.push(arc(BatchRow::new(batch, 9), chain, "x", "y"));
        let offset = list.prepend(front, |c| c);
        let moved = f0.offset(offset);
        assert_eq!(list.first_id(), Some(moved));
        assert_eq!(list.next(Some(moved)), Some(ids[2]));
        assert_eq!(list.get(ids[3]).unwrap().opened_at, BatchRow::new(batch, 3));
        assert_eq!(list.last_id(), Some(ids[3]));
    }

    #[test]
    fn staleness_and_visibility() {
        let alloc = BatchAllocator::new();
        let batch = alloc.reserve_new_batch();
        let mut shifts = BatchShifts::new();
        shifts.insert(batch, 0);
        let mut chains = ChainArena::new();
        let chain = chains.open(BatchRow::new(batch, 0));

        let mut closed = arc(BatchRow::new(batch, 1), chain, "c", "p");
        closed.closed_at = Some(BatchRow::new(batch, 4));
        assert!(!closed.is_stale(3, &shifts));
        assert!(closed.is_stale(4, &shifts));
        assert_eq!(closed.length(&shifts), Some(3));

        let dangling = arc(BatchRow::new(batch, 1), chain, "c", "gone");
        assert!(dangling.is_dangling());
        assert!(!dangling.is_stale(100, &shifts));

        let mut hidden = FxHashSet::default();
        hidden.insert(make_commit_id("c"));
        closed.junctions.push(ArcJunction {
            joined_at: BatchRow::new(batch, 2),
            joined_by: make_commit_id("m"),
        });
        assert!(!closed.is_visible(Some(&hidden), 1, &shifts));
        assert!(closed.is_visible(Some(&hidden), 2, &shifts));
        assert!(closed.is_visible(None, 1, &shifts));

        let into_hidden = arc(BatchRow::new(batch, 0), chain, "m", "c");
        assert!(!into_hidden.is_visible(Some(&hidden), 0, &shifts));
        assert!(into_hidden.is_visible(None, 0, &shifts));
    }
}
