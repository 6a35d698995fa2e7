// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! weave-core: incremental lane graph for commit DAG history views.
//!
//! The crate turns a child-before-parent commit sequence into a lane graph
//! (arcs on lanes, grouped into chains) that a history view can draw row by
//! row. The graph stores arcs plus sparse keyframes and replays any row on
//! demand, refreshes incrementally by splicing a newly woven prefix onto the
//! unchanged rest of the old graph, and derives hidden/foreign commit flags in
//! a single pass.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod arc;
mod batch;
mod chain;
mod constants;
/// Per-row drawing data (node column, lane columns) for history views.
pub mod diagram;
mod frame;
mod graph;
mod ident;
mod layout;
mod playback;
mod splicer;
mod trickle;
mod weaver;

/// Arcs and the stable-id arc list.
pub use arc::{ArcId, ArcJunction, ArcList, LaneArc};
/// Batch-relative rows and their allocation.
pub use batch::{BatchAllocator, BatchId, BatchRow, BatchShifts};
/// Chains of arcs sharing a lane.
pub use chain::{ChainArena, ChainId, ChainRecord};
/// Shared defaults.
pub use constants::DEFAULT_KEYFRAME_INTERVAL;
/// Sealed per-row lane snapshots.
pub use frame::Frame;
/// The lane graph, its configuration and lookup errors.
pub use graph::{ArcSummary, FrameSummary, Graph, GraphConfig, GraphError};
/// Commit identifiers and input records.
pub use ident::{make_commit_id, CommitId, CommitIdError, CommitRecord, Hash};
/// Column compaction.
pub use layout::{flatten_lanes, FlattenedLanes, LanePlacement};
/// Forward replay.
pub use playback::{PlaybackExhausted, PlaybackState};
/// Incremental refresh.
pub use splicer::{Equilibrium, GraphSplicer, SpliceOutcome, SpliceStep};
/// Hidden/foreign flag propagation.
pub use trickle::{GraphTrickle, TrickleState};
/// Incremental lane assignment.
pub use weaver::GraphWeaver;
