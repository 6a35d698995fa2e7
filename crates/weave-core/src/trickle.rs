// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Downward flag propagation through the commit sequence.
//!
//! A [`GraphTrickle`] marks the commits reachable from one set of tips but not
//! from another, in a single pass over the child-before-parent sequence. Tips
//! seed the frontier as [`TrickleState::Source`] (flagged) or
//! [`TrickleState::Blocked`] (not flagged). A flagged commit passes the flag
//! to its parents unless they are already decided; an unflagged commit blocks
//! its parents unless they are sources.
//!
//! Two uses share the engine: commits reachable only through hidden refs, and
//! commits reachable only through non-local refs.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::ident::{CommitId, CommitRecord};

/// Frontier state of a commit not yet consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrickleState {
    /// Not flagged; blocks the flag for its ancestors.
    Blocked,
    /// Flagged by a flagged child.
    PassThrough,
    /// Flagged tip.
    Source,
}

impl TrickleState {
    const fn is_flagged(self) -> bool {
        matches!(self, Self::PassThrough | Self::Source)
    }
}

/// One-pass flag propagator.
#[derive(Clone, Debug, Default)]
pub struct GraphTrickle {
    frontier: FxHashMap<CommitId, TrickleState>,
    live_flags: usize,
    flagged: FxHashSet<CommitId>,
    consumed: usize,
}

impl GraphTrickle {
    /// Creates a trickle with an empty frontier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trickle flagging commits reachable only from hidden tips.
    ///
    /// Visible tips are seeded after hidden ones, so a commit named by both
    /// stays visible.
    pub fn hidden_commits(
        hidden_tips: impl IntoIterator<Item = CommitId>,
        visible_tips: impl IntoIterator<Item = CommitId>,
    ) -> Self {
        let mut trickle = Self::new();
        for tip in hidden_tips {
            trickle.seed(tip, TrickleState::Source);
        }
        for tip in visible_tips {
            trickle.seed(tip, TrickleState::Blocked);
        }
        trickle
    }

    /// Trickle flagging commits reachable only from non-local tips.
    ///
    /// Non-local tips are seeded as pass-through, so one that is also an
    /// ancestor of a local branch ends up unflagged.
    pub fn foreign_commits(
        local_tips: impl IntoIterator<Item = CommitId>,
        other_tips: impl IntoIterator<Item = CommitId>,
    ) -> Self {
        let mut trickle = Self::new();
        for tip in other_tips {
            trickle.seed(tip, TrickleState::PassThrough);
        }
        for tip in local_tips {
            trickle.seed(tip, TrickleState::Blocked);
        }
        trickle
    }

    /// Sets the frontier state of `commit`; a later seed replaces an earlier one.
    pub fn seed(&mut self, commit: CommitId, state: TrickleState) {
        self.set(commit, state);
    }

    fn set(&mut self, commit: CommitId, state: TrickleState) {
        if state.is_flagged() {
            self.live_flags += 1;
        }
        if let Some(previous) = self.frontier.insert(commit, state) {
            if previous.is_flagged() {
                self.live_flags -= 1;
            }
        }
    }

    /// Consumes the next commit of the sequence. Returns whether it is flagged.
    pub fn feed(&mut self, commit: CommitId, parents: &[CommitId]) -> bool {
        self.consumed += 1;
        let state = self.frontier.remove(&commit);
        let flagged = state.is_some_and(TrickleState::is_flagged);
        if flagged {
            self.live_flags -= 1;
            self.flagged.insert(commit);
            for parent in parents {
                if !self.frontier.contains_key(parent) {
                    self.set(*parent, TrickleState::PassThrough);
                }
            }
        } else {
            for parent in parents {
                if self.frontier.get(parent) != Some(&TrickleState::Source) {
                    self.set(*parent, TrickleState::Blocked);
                }
            }
        }
        flagged
    }

    /// True when no flag can reach further commits.
    pub fn is_done(&self) -> bool {
        self.live_flags == 0
    }

    /// Number of commits fed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Commits flagged so far.
    pub fn flagged(&self) -> &FxHashSet<CommitId> {
        &self.flagged
    }

    /// Consumes the trickle, yielding the flagged commits.
    pub fn into_flagged(self) -> FxHashSet<CommitId> {
        self.flagged
    }

    /// Feeds commits from `tail` until the trickle is done. Returns how many
    /// were fed.
    pub fn stabilize<'a>(&mut self, tail: impl IntoIterator<Item = &'a CommitRecord>) -> usize {
        let mut fed = 0;
        for commit in tail {
            if self.is_done() {
                break;
            }
            self.feed(commit.id, &commit.parents);
            fed += 1;
        }
        trace!(fed, flagged = self.flagged.len(), "trickle settled");
        fed
    }
}
