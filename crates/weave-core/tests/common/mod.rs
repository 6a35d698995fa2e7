// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use weave_core::{
    BatchAllocator, CommitId, CommitRecord, Graph, GraphConfig, GraphSplicer, SpliceOutcome,
    SpliceStep,
};

/// Small interval so keyframe paths are exercised by short histories.
pub const SMALL_INTERVAL: GraphConfig = GraphConfig {
    keyframe_interval: 4,
};

/// Feeds `commits` to a splicer over `old` until equilibrium, then finishes.
pub fn splice(
    old: Graph,
    old_heads: &[CommitId],
    commits: &[CommitRecord],
    new_heads: &[CommitId],
    allocator: &BatchAllocator,
    config: GraphConfig,
) -> SpliceOutcome {
    let mut splicer = GraphSplicer::new(
        old,
        old_heads.iter().copied(),
        new_heads.iter().copied(),
        allocator,
        config,
    );
    for commit in commits {
        if splicer.splice_new_commit(commit) == SpliceStep::Equilibrium {
            break;
        }
    }
    splicer.finish()
}

/// Row index → commit id for a built graph.
pub fn rows_of(graph: &Graph) -> Vec<CommitId> {
    let mut rows: Vec<(usize, CommitId)> = graph.commits().map(|(id, row)| (row, id)).collect();
    rows.sort_unstable();
    rows.into_iter().map(|(_, id)| id).collect()
}
