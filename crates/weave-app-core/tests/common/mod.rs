// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use weave_app_core::{RefKind, RefSet, RefTip};
use weave_core::make_commit_id;

/// Routes session logs through the test harness; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_target(false)
        .without_time()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// `refs/heads/main` at `main` plus `refs/heads/feature` at `feature`.
pub fn two_branches(main: &str, feature: &str) -> RefSet {
    RefSet::new()
        .with(RefTip::new(
            "refs/heads/main",
            make_commit_id(main),
            RefKind::LocalBranch,
        ))
        .with(RefTip::new(
            "refs/heads/feature",
            make_commit_id(feature),
            RefKind::LocalBranch,
        ))
}
