// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rebuilding and refreshing a history view session.
#![allow(clippy::unwrap_used)]

mod common;

use common::{init_tracing, two_branches};
use weave_app_core::{RefKind, RefTip, WeaveConfig, WeaveSession};
use weave_core::{make_commit_id, Equilibrium};
use weave_dry_tests::{forked_history, random_history, replay_summaries, stack_on};

const SMALL: WeaveConfig = WeaveConfig {
    keyframe_interval: 4,
};

#[test]
fn rebuild_weaves_every_commit() {
    init_tracing();
    let mut session = WeaveSession::new(SMALL);
    let report = session.rebuild(forked_history(), &two_branches("a1", "b1"));
    assert_eq!(report.rows, 6);
    assert_eq!(report.peak_arc_count, session.graph().peak_arc_count());
    assert_eq!((report.hidden, report.foreign), (0, 0));
    assert_eq!(session.sequence(), forked_history().as_slice());
}

#[test]
fn hidden_branch_flags_only_its_own_commits() {
    init_tracing();
    let mut refs = two_branches("a1", "b1");
    refs.hide("refs/heads/feature");
    let mut session = WeaveSession::new(SMALL);
    let report = session.rebuild(forked_history(), &refs);
    assert_eq!(report.hidden, 2);
    assert!(session.is_hidden(&make_commit_id("b1")));
    assert!(session.is_hidden(&make_commit_id("b2")));
    assert!(!session.is_hidden(&make_commit_id("a3")));
}

#[test]
fn remote_only_branch_is_foreign() {
    init_tracing();
    let refs = weave_app_core::RefSet::new()
        .with(RefTip::new(
            "refs/heads/main",
            make_commit_id("a1"),
            RefKind::LocalBranch,
        ))
        .with(RefTip::new(
            "refs/remotes/origin/feature",
            make_commit_id("b1"),
            RefKind::RemoteBranch,
        ));
    let mut session = WeaveSession::new(SMALL);
    session.rebuild(forked_history(), &refs);
    let foreign = session.foreign_commits();
    assert_eq!(foreign.len(), 2);
    assert!(session.is_foreign(&make_commit_id("b2")));
    assert!(!session.is_foreign(&make_commit_id("a1")));
}

#[test]
fn refresh_splices_new_commits_on_top() {
    init_tracing();
    let history = forked_history();
    let mut session = WeaveSession::new(SMALL);
    session.rebuild(history.clone(), &two_branches("a1", "b1"));

    let refreshed = stack_on(&history, make_commit_id("a1"), "x", 2);
    let report = session.refresh(refreshed.clone(), &two_branches("x0", "b1"));
    assert_eq!(
        report.equilibrium,
        Some(Equilibrium {
            new_row: 2,
            old_row: 0
        })
    );
    assert_eq!(report.commits_fed, 3);
    assert_eq!((report.rows_added, report.rows_removed), (2, 0));
    assert_eq!(report.rows, 8);
    assert_eq!(session.sequence(), refreshed.as_slice());
    assert_eq!(
        session.graph_mut().get_commit_row(make_commit_id("a4")).unwrap(),
        7
    );
}

#[test]
fn refresh_keeps_hidden_branch_flags() {
    init_tracing();
    let history = forked_history();
    let mut refs = two_branches("a1", "b1");
    refs.hide("refs/heads/feature");
    let mut session = WeaveSession::new(SMALL);
    session.rebuild(history.clone(), &refs);

    let mut new_refs = two_branches("x0", "b1");
    new_refs.hide("refs/heads/feature");
    let refreshed = stack_on(&history, make_commit_id("a1"), "x", 2);
    let report = session.refresh(refreshed, &new_refs);
    assert_eq!(
        report.equilibrium,
        Some(Equilibrium {
            new_row: 2,
            old_row: 0
        })
    );
    assert_eq!(report.hidden, 2);
    assert!(session.is_hidden(&make_commit_id("b1")));
    assert!(session.is_hidden(&make_commit_id("b2")));
    for visible in ["x0", "x1", "a1", "a3"] {
        assert!(!session.is_hidden(&make_commit_id(visible)), "{visible}");
    }
}

#[test]
fn refresh_hides_a_ref_tip_new_in_the_prefix() {
    init_tracing();
    let history = forked_history();
    let mut session = WeaveSession::new(SMALL);
    session.rebuild(history.clone(), &two_branches("a1", "b1"));
    assert!(session.hidden_commits().is_empty());

    let mut refs = two_branches("a1", "b1").with(RefTip::new(
        "refs/heads/wip",
        make_commit_id("x0"),
        RefKind::LocalBranch,
    ));
    refs.hide("refs/heads/wip");
    let refreshed = stack_on(&history, make_commit_id("a1"), "x", 2);
    let report = session.refresh(refreshed, &refs);
    assert!(report.equilibrium.is_some());
    assert_eq!(report.rows_added, 2);
    assert_eq!(report.hidden, 2);
    assert!(session.is_hidden(&make_commit_id("x0")));
    assert!(session.is_hidden(&make_commit_id("x1")));
    for visible in ["a1", "b1", "b2"] {
        assert!(!session.is_hidden(&make_commit_id(visible)), "{visible}");
    }
}

#[test]
fn refresh_without_equilibrium_replaces_the_graph() {
    init_tracing();
    let mut session = WeaveSession::new(SMALL);
    session.rebuild(forked_history(), &two_branches("a1", "b1"));

    let unrelated = random_history(11, "u", 20);
    let refs = weave_app_core::RefSet::new().with(RefTip::new(
        "refs/heads/main",
        unrelated[0].id,
        RefKind::LocalBranch,
    ));
    let report = session.refresh(unrelated.clone(), &refs);
    assert_eq!(report.equilibrium, None);
    assert_eq!(report.commits_fed, 20);
    assert_eq!((report.rows_added, report.rows_removed), (20, 6));
    assert_eq!(session.sequence(), unrelated.as_slice());
    assert!(!session.graph().contains(&make_commit_id("a1")));
}

#[test]
fn refreshed_graph_matches_a_fresh_rebuild() {
    init_tracing();
    let history = random_history(21, "r", 90);
    let refs = weave_app_core::RefSet::new().with(RefTip::new(
        "refs/heads/main",
        history[0].id,
        RefKind::LocalBranch,
    ));
    let mut session = WeaveSession::new(SMALL);
    session.rebuild(history.clone(), &refs);

    let refreshed = stack_on(&history, history[0].id, "n", 3);
    let new_refs = weave_app_core::RefSet::new().with(RefTip::new(
        "refs/heads/main",
        refreshed[0].id,
        RefKind::LocalBranch,
    ));
    session.refresh(refreshed.clone(), &new_refs);

    let mut fresh = WeaveSession::new(SMALL);
    fresh.rebuild(refreshed, &new_refs);
    assert_eq!(session.sequence(), fresh.sequence());
    assert_eq!(
        replay_summaries(session.graph()),
        replay_summaries(fresh.graph())
    );
}

#[test]
fn dropping_the_session_releases_its_batches() {
    let mut session = WeaveSession::new(SMALL);
    session.rebuild(forked_history(), &two_branches("a1", "b1"));
    let allocator = session.allocator().clone();
    assert!(allocator.live_batches() > 0);
    drop(session);
    assert_eq!(allocator.live_batches(), 0);
}
