// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-row drawing data for a history view.
//!
//! A renderer needs, for every visible row, where the commit node sits and
//! which column each lane occupies above and below it. [`layout`] computes
//! that for a whole graph in one forward pass; [`layout_rows`] computes it for
//! a window of rows, seeking through keyframes.

use std::ops::Range;

use rustc_hash::FxHashSet;

use crate::frame::Frame;
use crate::graph::{Graph, GraphError};
use crate::ident::CommitId;
use crate::layout::{flatten_lanes, LanePlacement};
use crate::playback::PlaybackState;

/// Drawing data of one row.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RowLayout {
    /// Row index.
    pub row: usize,
    /// Commit drawn on the row.
    pub commit: CommitId,
    /// Lane of the commit node.
    pub node_lane: usize,
    /// Column of the commit node.
    pub node_column: usize,
    /// Column placement per lane.
    pub lanes: Vec<LanePlacement>,
    /// Columns needed by the row.
    pub column_count: usize,
}

fn row_layout(graph: &Graph, frame: &Frame, hidden: Option<&FxHashSet<CommitId>>) -> RowLayout {
    let flat = flatten_lanes(graph, frame, hidden);
    let placed = flat
        .lanes
        .get(frame.commit_lane)
        .and_then(|placement| placement.above.or(placement.below));
    let (node_column, column_count) = match placed {
        Some(column) => (column, flat.column_count),
        // A commit with neither parents nor children gets a column of its own.
        None => (flat.column_count, flat.column_count + 1),
    };
    RowLayout {
        row: graph.resolve(frame.row),
        commit: frame.commit,
        node_lane: frame.commit_lane,
        node_column,
        lanes: flat.lanes,
        column_count,
    }
}

/// Lays out every row of `graph`.
pub fn layout(graph: &Graph, hidden: Option<&FxHashSet<CommitId>>) -> Vec<RowLayout> {
    let mut state = PlaybackState::new();
    let mut rows = Vec::with_capacity(graph.len());
    while state.advance_to_next_row(graph).is_ok() {
        let Some(frame) = state.seal_copy() else {
            break;
        };
        rows.push(row_layout(graph, &frame, hidden));
    }
    rows
}

/// Lays out the rows in `range`, seeking to its start through keyframes.
pub fn layout_rows(
    graph: &mut Graph,
    range: Range<usize>,
    hidden: Option<&FxHashSet<CommitId>>,
) -> Result<Vec<RowLayout>, GraphError> {
    let end = range.end.min(graph.len());
    if range.start >= end {
        return Ok(Vec::new());
    }
    let mut state = graph.start_playback(range.start)?;
    let mut rows = Vec::with_capacity(end - range.start);
    for row in range.start..end {
        if row > range.start {
            state
                .advance_to_next_row(graph)
                .map_err(|_| GraphError::RowNotFound { row })?;
        }
        let frame = state.seal_copy().ok_or(GraphError::RowNotFound { row })?;
        rows.push(row_layout(graph, &frame, hidden));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::batch::BatchAllocator;
    use crate::graph::GraphConfig;
    use crate::ident::{make_commit_id, CommitRecord};

    #[test]
    fn lone_commit_gets_its_own_column() {
        let alloc = BatchAllocator::new();
        let commits = [CommitRecord::new(make_commit_id("solo"), Vec::new())];
        let graph = Graph::build(&commits, &alloc, GraphConfig::default());
        let rows = layout(&graph, None);
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].node_column, rows[0].column_count), (0, 1));
    }

    #[test]
    fn windowed_layout_matches_full_layout() {
        let alloc = BatchAllocator::new();
        let commits: Vec<CommitRecord> = (0..20)
            .map(|i| {
                let parents = if i < 19 {
                    vec![make_commit_id(&format!("c{}", i + 1))]
                } else {
                    Vec::new()
                };
                CommitRecord::new(make_commit_id(&format!("c{i}")), parents)
            })
            .collect();
        let config = GraphConfig {
            keyframe_interval: 3,
        };
        let mut graph = Graph::build(&commits, &alloc, config);
        let full = layout(&graph, None);
        let window = layout_rows(&mut graph, 7..12, None).unwrap();
        assert_eq!(window, full[7..12].to_vec());
        assert!(layout_rows(&mut graph, 25..30, None).unwrap().is_empty());
    }
}
