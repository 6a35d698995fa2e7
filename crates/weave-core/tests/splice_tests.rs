// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Splicing a refreshed sequence onto an existing graph.
#![allow(clippy::unwrap_used)]

mod common;

use common::{rows_of, splice, SMALL_INTERVAL};
use weave_core::{make_commit_id, BatchAllocator, Equilibrium, Graph};
use weave_dry_tests::{
    commit, forked_history, heads_of, keyframe_replays, linear_history, random_history,
    replay_summaries, stack_on,
};

#[test]
fn identical_sequence_is_idempotent() {
    let alloc = BatchAllocator::new();
    let history = random_history(3, "r", 120);
    let heads = heads_of(&history);
    let old = Graph::build(&history, &alloc, SMALL_INTERVAL);
    let expected = replay_summaries(&old);

    let outcome = splice(old, &heads, &history, &heads, &alloc, SMALL_INTERVAL);
    assert_eq!(outcome.rows_added, 0);
    assert_eq!(outcome.rows_removed, 0);
    assert!(outcome.equilibrium.is_some());
    assert_eq!(replay_summaries(&outcome.graph), expected);
}

#[test]
fn stacked_commits_meet_at_old_head() {
    let alloc = BatchAllocator::new();
    let history = forked_history();
    let old_heads = heads_of(&history);
    let old = Graph::build(&history, &alloc, SMALL_INTERVAL);

    let refreshed = stack_on(&history, make_commit_id("a1"), "x", 3);
    let new_heads = heads_of(&refreshed);
    let outcome = splice(old, &old_heads, &refreshed, &new_heads, &alloc, SMALL_INTERVAL);
    assert_eq!(
        outcome.equilibrium,
        Some(Equilibrium {
            new_row: 3,
            old_row: 0
        })
    );
    assert_eq!((outcome.rows_added, outcome.rows_removed), (3, 0));

    let linear = Graph::build(&refreshed, &alloc, SMALL_INTERVAL);
    assert_eq!(rows_of(&outcome.graph), rows_of(&linear));
    assert_eq!(replay_summaries(&outcome.graph), replay_summaries(&linear));
}

#[test]
fn deleted_branch_rows_are_removed() {
    let alloc = BatchAllocator::new();
    let history = forked_history();
    let old_heads = heads_of(&history);
    let old = Graph::build(&history, &alloc, SMALL_INTERVAL);

    let pruned: Vec<_> = history
        .iter()
        .filter(|c| c.id != make_commit_id("b1") && c.id != make_commit_id("b2"))
        .cloned()
        .collect();
    let new_heads = heads_of(&pruned);
    let outcome = splice(old, &old_heads, &pruned, &new_heads, &alloc, SMALL_INTERVAL);
    assert!(outcome.equilibrium.is_some());
    assert_eq!(outcome.rows_added, 0);
    assert_eq!(outcome.rows_removed, 2);
    assert!(outcome.removed_commits.contains(&make_commit_id("b2")));

    let linear = Graph::build(&pruned, &alloc, SMALL_INTERVAL);
    assert_eq!(replay_summaries(&outcome.graph), replay_summaries(&linear));
}

#[test]
fn moved_branch_reconciles_arcs_across_the_seam() {
    let alloc = BatchAllocator::new();
    let base = linear_history("m", 30);
    let mut history = vec![commit("f0", &["f1"]), commit("f1", &["m20"])];
    history.extend(base.iter().cloned());
    let old_heads = heads_of(&history);
    let old = Graph::build(&history, &alloc, SMALL_INTERVAL);

    // Mainline gains two commits; the feature branch is untouched.
    let mut refreshed = vec![commit("n0", &["n1"]), commit("n1", &["m0"])];
    refreshed.extend(history.iter().cloned());
    let new_heads = heads_of(&refreshed);
    let outcome = splice(old, &old_heads, &refreshed, &new_heads, &alloc, SMALL_INTERVAL);
    assert!(outcome.equilibrium.is_some());
    assert_eq!((outcome.rows_added, outcome.rows_removed), (2, 0));

    let linear = Graph::build(&refreshed, &alloc, SMALL_INTERVAL);
    assert_eq!(replay_summaries(&outcome.graph), replay_summaries(&linear));
    for (replayed, stored) in keyframe_replays(&outcome.graph) {
        assert_eq!(replayed, stored);
    }
}

#[test]
fn rows_stay_addressable_after_splice() {
    let alloc = BatchAllocator::new();
    let history = random_history(9, "r", 80);
    let old_heads = heads_of(&history);
    let old = Graph::build(&history, &alloc, SMALL_INTERVAL);
    let onto = history[0].id;
    let refreshed = stack_on(&history, onto, "s", 5);
    let new_heads = heads_of(&refreshed);
    let mut graph = splice(old, &old_heads, &refreshed, &new_heads, &alloc, SMALL_INTERVAL).graph;

    assert_eq!(graph.len(), 85);
    for (row, record) in refreshed.iter().enumerate() {
        assert_eq!(graph.get_commit_row(record.id).unwrap(), row);
        assert_eq!(graph.get_commit_frame(record.id).unwrap().commit, record.id);
    }
    let rows = graph.keyframe_rows();
    assert!(rows.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn splicing_releases_dead_batches() {
    let alloc = BatchAllocator::new();
    let history = forked_history();
    let heads = heads_of(&history);
    let mut graph = Graph::build(&history, &alloc, SMALL_INTERVAL);
    let mut current = history.clone();
    for round in 0..6 {
        let onto = current[0].id;
        let refreshed = stack_on(&current, onto, &format!("g{round}-"), 1);
        let new_heads = heads_of(&refreshed);
        let old_heads = heads_of(&current);
        graph = splice(graph, &old_heads, &refreshed, &new_heads, &alloc, SMALL_INTERVAL).graph;
        current = refreshed;
        assert!(alloc.live_batches() <= round + 2);
    }
    assert_eq!(graph.len(), history.len() + 6);
    assert_ne!(heads, heads_of(&current));
    drop(graph);
    assert_eq!(alloc.live_batches(), 0);
}
