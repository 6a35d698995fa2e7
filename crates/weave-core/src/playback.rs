// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Forward replay of a graph's arc list.
//!
//! A [`PlaybackState`] is a mutable frame that can only move forward. Each
//! step consumes the arcs opened at the next row: arcs that row closes move to
//! the solved set, and the newly opened arcs take their lanes. Starting from a
//! keyframe and stepping forward reproduces exactly the frames the weaver saw.
//!
//! # Invariants
//!
//! - Playback never mutates the graph it replays.
//! - Placeholders are consumed but never occupy a lane.

use thiserror::Error;

use crate::arc::ArcId;
use crate::batch::BatchRow;
use crate::frame::{put_lane, trim_lanes, Frame};
use crate::graph::Graph;
use crate::ident::CommitId;

/// Returned when playback runs off the end of the arc list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("playback reached the end of the graph")]
pub struct PlaybackExhausted;

/// Mutable, forward-only frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlaybackState {
    row: Option<BatchRow>,
    commit: Option<CommitId>,
    commit_lane: usize,
    solved_arcs: Vec<Option<ArcId>>,
    open_arcs: Vec<Option<ArcId>>,
    last_arc: Option<ArcId>,
}

impl PlaybackState {
    /// State positioned before the first row.
    pub fn new() -> Self {
        Self::default()
    }

    /// State positioned at a keyframe's row.
    pub fn from_keyframe(frame: &Frame) -> Self {
        Self {
            row: Some(frame.row),
            commit: Some(frame.commit),
            commit_lane: frame.commit_lane,
            solved_arcs: frame.solved_arcs.clone(),
            open_arcs: frame.open_arcs.clone(),
            last_arc: Some(frame.last_arc),
        }
    }

    /// Current row; `None` before the first row.
    pub fn row(&self) -> Option<BatchRow> {
        self.row
    }

    /// Commit at the current row.
    pub fn commit(&self) -> Option<CommitId> {
        self.commit
    }

    /// Lane of the current commit.
    pub fn commit_lane(&self) -> usize {
        self.commit_lane
    }

    /// Arcs live below the current row, by lane.
    pub fn open_arcs(&self) -> &[Option<ArcId>] {
        &self.open_arcs
    }

    /// Arcs closed at the current row, by lane.
    pub fn solved_arcs(&self) -> &[Option<ArcId>] {
        &self.solved_arcs
    }

    /// Last arc consumed.
    pub fn last_arc(&self) -> Option<ArcId> {
        self.last_arc
    }

    /// Steps to the next row of `graph`. Returns the new row.
    pub fn advance_to_next_row(&mut self, graph: &Graph) -> Result<BatchRow, PlaybackExhausted> {
        let first = graph.next_arc(self.last_arc).ok_or(PlaybackExhausted)?;
        let arc = graph.arc(first).ok_or(PlaybackExhausted)?;
        let (row, commit) = (arc.opened_at, arc.opened_by);

        for slot in &mut self.solved_arcs {
            *slot = None;
        }
        for lane in 0..self.open_arcs.len() {
            let Some(id) = self.open_arcs[lane] else {
                continue;
            };
            let closes_here = graph
                .arc(id)
                .is_some_and(|open| open.closed_by == commit && open.closed_at.is_some());
            if closes_here {
                self.open_arcs[lane] = None;
                put_lane(&mut self.solved_arcs, lane, Some(id));
            }
        }

        self.row = Some(row);
        self.commit = Some(commit);
        self.commit_lane = arc.lane;
        let mut cursor = Some(first);
        while let Some(id) = cursor {
            let Some(arc) = graph.arc(id) else {
                break;
            };
            if arc.opened_at != row {
                break;
            }
            if !arc.is_placeholder() {
                put_lane(&mut self.open_arcs, arc.lane, Some(id));
            }
            self.last_arc = Some(id);
            cursor = graph.next_arc(Some(id));
        }
        trim_lanes(&mut self.solved_arcs, &mut self.open_arcs);
        Ok(row)
    }

    /// Steps forward until `target` is the current commit. Returns every
    /// commit entered on the way, `target` included.
    pub fn advance_to_commit(
        &mut self,
        graph: &Graph,
        target: CommitId,
    ) -> Result<Vec<CommitId>, PlaybackExhausted> {
        let mut entered = Vec::new();
        while self.commit != Some(target) {
            self.advance_to_next_row(graph)?;
            entered.extend(self.commit);
        }
        Ok(entered)
    }

    /// Immutable copy of the current frame; `None` before the first row.
    pub fn seal_copy(&self) -> Option<Frame> {
        Some(Frame::new(
            self.row?,
            self.commit?,
            self.commit_lane,
            self.solved_arcs.clone(),
            self.open_arcs.clone(),
            self.last_arc?,
        ))
    }
}
