// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Column compaction for one row.
//!
//! Lanes are stable across rows but sparse: hidden arcs and freed lanes leave
//! gaps. [`flatten_lanes`] maps the visible arcs of a frame onto dense columns,
//! separately for the half-row above the node and the half-row below it, so a
//! renderer can draw short diagonals where an arc changes column.

use rustc_hash::FxHashSet;

use crate::arc::ArcId;
use crate::frame::Frame;
use crate::graph::Graph;
use crate::ident::CommitId;

/// Columns of one lane in the upper and lower half of a row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LanePlacement {
    /// Column entering the row from above.
    pub above: Option<usize>,
    /// Column leaving the row downward.
    pub below: Option<usize>,
}

/// Compacted columns of a frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlattenedLanes {
    /// Placement per lane of the frame.
    pub lanes: Vec<LanePlacement>,
    /// Number of columns needed by the wider half.
    pub column_count: usize,
}

/// Maps the visible arcs of `frame` onto dense columns.
///
/// Within each half, columns go to lanes in ascending order of their chain's
/// top row, then lane: column 0 belongs to the earliest-started chain.
pub fn flatten_lanes(
    graph: &Graph,
    frame: &Frame,
    hidden: Option<&FxHashSet<CommitId>>,
) -> FlattenedLanes {
    let row = graph.resolve(frame.row);
    let visible = |id: ArcId| {
        graph
            .arc(id)
            .filter(|arc| arc.is_visible(hidden, row, &graph.shifts))
    };

    let mut above: Vec<((usize, usize), usize)> = Vec::new();
    let mut below: Vec<((usize, usize), usize)> = Vec::new();
    for lane in 0..frame.lane_count() {
        let entering = frame.solved_arc(lane).or_else(|| {
            frame
                .open_arc(lane)
                .filter(|id| graph.arc(*id).is_some_and(|arc| arc.opened_at != frame.row))
        });
        if let Some(arc) = entering.and_then(&visible) {
            above.push(((graph.chain_top(arc.chain), lane), lane));
        }
        if let Some(arc) = frame.open_arc(lane).and_then(&visible) {
            below.push(((graph.chain_top(arc.chain), lane), lane));
        }
    }
    above.sort_unstable();
    below.sort_unstable();

    let mut lanes = vec![LanePlacement::default(); frame.lane_count()];
    for (column, (_, lane)) in above.iter().enumerate() {
        lanes[*lane].above = Some(column);
    }
    for (column, (_, lane)) in below.iter().enumerate() {
        lanes[*lane].below = Some(column);
    }
    FlattenedLanes {
        lanes,
        column_count: above.len().max(below.len()),
    }
}
