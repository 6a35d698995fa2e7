// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Commit sequence fixtures.
//!
//! Every helper returns commits child-before-parent, the order the weaver
//! expects. Ids come from [`make_commit_id`], so a label always maps to the
//! same commit.

use std::collections::BTreeSet;

use weave_core::{make_commit_id, CommitId, CommitRecord};

/// Builds a commit record from labels.
pub fn commit(label: &str, parents: &[&str]) -> CommitRecord {
    CommitRecord::new(
        make_commit_id(label),
        parents.iter().map(|parent| make_commit_id(parent)).collect(),
    )
}

/// Ids for a list of labels.
pub fn ids(labels: &[&str]) -> Vec<CommitId> {
    labels.iter().map(|label| make_commit_id(label)).collect()
}

/// A straight line `{prefix}0 -> {prefix}1 -> ... -> {prefix}{len-1}`, newest
/// first; the last commit is a root.
pub fn linear_history(prefix: &str, len: usize) -> Vec<CommitRecord> {
    (0..len)
        .map(|i| {
            let parents = if i + 1 < len {
                vec![make_commit_id(&format!("{prefix}{}", i + 1))]
            } else {
                Vec::new()
            };
            CommitRecord::new(make_commit_id(&format!("{prefix}{i}")), parents)
        })
        .collect()
}

/// Mainline `a1 -> a2 -> a3 -> a4` with a side branch `b1 -> b2` that
/// forks from `a3`.
///
/// Rows: `a1` 0, `a2` 1, `b1` 2, `b2` 3, `a3` 4, `a4` 5. Heads are `a1` and
/// `b1`.
pub fn forked_history() -> Vec<CommitRecord> {
    vec![
        commit("a1", &["a2"]),
        commit("a2", &["a3"]),
        commit("b1", &["b2"]),
        commit("b2", &["a3"]),
        commit("a3", &["a4"]),
        commit("a4", &[]),
    ]
}

/// Commits that no other commit of `commits` names as a parent, in sequence
/// order.
pub fn heads_of(commits: &[CommitRecord]) -> Vec<CommitId> {
    let parents: BTreeSet<CommitId> = commits
        .iter()
        .flat_map(|c| c.parents.iter().copied())
        .collect();
    commits
        .iter()
        .map(|c| c.id)
        .filter(|id| !parents.contains(id))
        .collect()
}

/// `count` new commits stacked on `onto`, newest first, ahead of `history`.
pub fn stack_on(
    history: &[CommitRecord],
    onto: CommitId,
    prefix: &str,
    count: usize,
) -> Vec<CommitRecord> {
    let mut stacked: Vec<CommitRecord> = (0..count)
        .map(|i| {
            let parent = if i + 1 < count {
                make_commit_id(&format!("{prefix}{}", i + 1))
            } else {
                onto
            };
            CommitRecord::new(make_commit_id(&format!("{prefix}{i}")), vec![parent])
        })
        .collect();
    stacked.extend(history.iter().cloned());
    stacked
}

/// Tiny deterministic RNG (xorshift64*) so tests don't need `rand`.
#[derive(Clone, Debug)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Creates a generator; a zero seed is replaced with 1.
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    /// Next value of the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Value in `[0, upper)`; 0 when `upper <= 1`.
    pub fn below(&mut self, upper: usize) -> usize {
        if upper <= 1 {
            return 0;
        }
        usize::try_from(self.next_u64() % upper as u64).unwrap_or(0)
    }
}

/// Random history of `len` commits labelled `{prefix}{n}`.
///
/// Commits are generated oldest first, each picking up to two parents among
/// the eight most recent older commits (so branches stay short-lived and
/// merge back), and returned newest first. Roughly one commit in `len / 4`
/// starts a fresh root.
pub fn random_history(seed: u64, prefix: &str, len: usize) -> Vec<CommitRecord> {
    let mut rng = XorShift64::new(seed);
    let mut oldest_first: Vec<CommitRecord> = Vec::with_capacity(len);
    for n in 0..len {
        let id = make_commit_id(&format!("{prefix}{n}"));
        let mut parents = Vec::new();
        if n > 0 && rng.below(len.max(4) / 4) != 0 {
            let window = n.min(8);
            parents.push(oldest_first[n - 1 - rng.below(window)].id);
            if window > 1 && rng.below(4) == 0 {
                let second = oldest_first[n - 1 - rng.below(window)].id;
                if !parents.contains(&second) {
                    parents.push(second);
                }
            }
        }
        oldest_first.push(CommitRecord::new(id, parents));
    }
    oldest_first.reverse();
    oldest_first
}
