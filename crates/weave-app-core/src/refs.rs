// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ref tips feeding a history view.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use weave_core::CommitId;

/// Kind of a ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefKind {
    /// Branch of the local repository.
    LocalBranch,
    /// Remote-tracking branch.
    RemoteBranch,
    /// Tag.
    Tag,
    /// Anything else (stash, notes, detached head).
    Other,
}

/// A named ref and the commit it points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefTip {
    /// Full ref name.
    pub name: String,
    /// Commit the ref points to.
    pub target: CommitId,
    /// Kind of the ref.
    pub kind: RefKind,
}

impl RefTip {
    /// Creates a ref tip.
    pub fn new(name: impl Into<String>, target: CommitId, kind: RefKind) -> Self {
        Self {
            name: name.into(),
            target,
            kind,
        }
    }
}

/// Current refs of a repository plus the names the user chose to hide.
#[derive(Debug, Clone, Default)]
pub struct RefSet {
    tips: Vec<RefTip>,
    hidden: BTreeSet<String>,
}

impl RefSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tip.
    pub fn push(&mut self, tip: RefTip) {
        self.tips.push(tip);
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, tip: RefTip) -> Self {
        self.push(tip);
        self
    }

    /// Marks the ref named `name` as hidden.
    pub fn hide(&mut self, name: impl Into<String>) {
        self.hidden.insert(name.into());
    }

    /// True when the ref named `name` is hidden.
    pub fn is_hidden(&self, name: &str) -> bool {
        self.hidden.contains(name)
    }

    /// All tips.
    pub fn tips(&self) -> &[RefTip] {
        &self.tips
    }

    /// Distinct target commits of all tips, in first-seen order.
    pub fn heads(&self) -> Vec<CommitId> {
        distinct(self.tips.iter())
    }

    /// Targets of hidden refs.
    pub fn hidden_targets(&self) -> Vec<CommitId> {
        distinct(self.tips.iter().filter(|tip| self.is_hidden(&tip.name)))
    }

    /// Targets of refs that are not hidden.
    pub fn visible_targets(&self) -> Vec<CommitId> {
        distinct(self.tips.iter().filter(|tip| !self.is_hidden(&tip.name)))
    }

    /// Targets of local branches.
    pub fn local_targets(&self) -> Vec<CommitId> {
        distinct(
            self.tips
                .iter()
                .filter(|tip| tip.kind == RefKind::LocalBranch),
        )
    }

    /// Targets of every ref that is not a local branch.
    pub fn non_local_targets(&self) -> Vec<CommitId> {
        distinct(
            self.tips
                .iter()
                .filter(|tip| tip.kind != RefKind::LocalBranch),
        )
    }
}

fn distinct<'a>(tips: impl Iterator<Item = &'a RefTip>) -> Vec<CommitId> {
    let mut seen = BTreeSet::new();
    tips.filter(|tip| seen.insert(tip.target))
        .map(|tip| tip.target)
        .collect()
}
