// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Frame replay helpers for comparing graphs.

use weave_core::{Frame, FrameSummary, Graph, PlaybackState};

/// Every frame of `graph`, in row order, replayed from the start.
pub fn replay_frames(graph: &Graph) -> Vec<Frame> {
    let mut state = PlaybackState::new();
    let mut frames = Vec::with_capacity(graph.len());
    while state.advance_to_next_row(graph).is_ok() {
        frames.extend(state.seal_copy());
    }
    frames
}

/// Graph-independent summaries of every frame of `graph`.
pub fn replay_summaries(graph: &Graph) -> Vec<FrameSummary> {
    replay_frames(graph)
        .iter()
        .map(|frame| graph.frame_summary(frame))
        .collect()
}

/// For each keyframe, the frame obtained by replaying from the previous
/// keyframe (or from the start) to the keyframe's row, paired with the
/// stored keyframe.
pub fn keyframe_replays(graph: &Graph) -> Vec<(Frame, Frame)> {
    let keyframes = graph.keyframes();
    let mut pairs = Vec::with_capacity(keyframes.len());
    for (index, stored) in keyframes.iter().enumerate() {
        let mut state = match index.checked_sub(1) {
            Some(previous) => PlaybackState::from_keyframe(&keyframes[previous]),
            None => PlaybackState::new(),
        };
        while state.row() != Some(stored.row) {
            if state.advance_to_next_row(graph).is_err() {
                break;
            }
        }
        if let Some(replayed) = state.seal_copy() {
            pairs.push((replayed, stored.clone()));
        }
    }
    pairs
}
