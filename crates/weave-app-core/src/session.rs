// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! History view session: owns the current lane graph and keeps it fresh.
//!
//! A session holds the graph, the commit sequence it was built from, the ref
//! heads of that build, and the hidden/foreign commit flags. [`rebuild`]
//! weaves from scratch; [`refresh`] splices a new sequence onto the current
//! graph and only falls back to a full replacement when no equilibrium is
//! found.
//!
//! [`rebuild`]: WeaveSession::rebuild
//! [`refresh`]: WeaveSession::refresh

use rustc_hash::FxHashSet;
use tracing::{debug, info, instrument};
use weave_core::{
    BatchAllocator, CommitId, CommitRecord, Equilibrium, Graph, GraphSplicer, GraphTrickle,
    SpliceStep,
};

use crate::refs::RefSet;
use crate::settings::WeaveConfig;

/// Summary of a full rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    /// Rows in the new graph.
    pub rows: usize,
    /// Largest number of simultaneously open arcs.
    pub peak_arc_count: usize,
    /// Keyframes saved while weaving.
    pub keyframes: usize,
    /// Commits flagged hidden.
    pub hidden: usize,
    /// Commits flagged foreign.
    pub foreign: usize,
}

/// Summary of an incremental refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    /// Where new and old graphs met; `None` when the graph was replaced.
    pub equilibrium: Option<Equilibrium>,
    /// Commits of the new sequence woven before stopping.
    pub commits_fed: usize,
    /// Rows that appeared.
    pub rows_added: usize,
    /// Rows that disappeared.
    pub rows_removed: usize,
    /// Commits whose rows disappeared.
    pub removed_commits: Vec<CommitId>,
    /// Rows in the refreshed graph.
    pub rows: usize,
    /// Commits flagged hidden.
    pub hidden: usize,
    /// Commits flagged foreign.
    pub foreign: usize,
}

/// A history view's graph and flags.
#[derive(Debug)]
pub struct WeaveSession {
    config: WeaveConfig,
    allocator: BatchAllocator,
    graph: Graph,
    sequence: Vec<CommitRecord>,
    heads: Vec<CommitId>,
    hidden: FxHashSet<CommitId>,
    foreign: FxHashSet<CommitId>,
}

impl WeaveSession {
    /// Creates a session with an empty graph.
    pub fn new(config: WeaveConfig) -> Self {
        let allocator = BatchAllocator::new();
        let graph = Graph::new(allocator.clone(), config.graph_config());
        Self {
            config,
            allocator,
            graph,
            sequence: Vec::new(),
            heads: Vec::new(),
            hidden: FxHashSet::default(),
            foreign: FxHashSet::default(),
        }
    }

    /// Settings of this session.
    pub fn config(&self) -> WeaveConfig {
        self.config
    }

    /// Batch allocator shared by every graph of this session.
    pub fn allocator(&self) -> &BatchAllocator {
        &self.allocator
    }

    /// Current graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Current graph, mutably (for seeking, which caches keyframes).
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Commit sequence the current graph describes, row by row.
    pub fn sequence(&self) -> &[CommitRecord] {
        &self.sequence
    }

    /// Commits reachable only through hidden refs.
    pub fn hidden_commits(&self) -> &FxHashSet<CommitId> {
        &self.hidden
    }

    /// Commits reachable only through refs that are not local branches.
    pub fn foreign_commits(&self) -> &FxHashSet<CommitId> {
        &self.foreign
    }

    /// True when `commit` is flagged hidden.
    pub fn is_hidden(&self, commit: &CommitId) -> bool {
        self.hidden.contains(commit)
    }

    /// True when `commit` is flagged foreign.
    pub fn is_foreign(&self, commit: &CommitId) -> bool {
        self.foreign.contains(commit)
    }

    /// Weaves `commits` from scratch, replacing the current graph.
    #[instrument(skip_all, fields(commits = commits.len()))]
    pub fn rebuild(&mut self, commits: Vec<CommitRecord>, refs: &RefSet) -> BuildReport {
        self.graph = Graph::build(&commits, &self.allocator, self.config.graph_config());
        self.sequence = commits;
        self.heads = refs.heads();
        self.recompute_flags(refs);
        let report = BuildReport {
            rows: self.graph.len(),
            peak_arc_count: self.graph.peak_arc_count(),
            keyframes: self.graph.keyframe_count(),
            hidden: self.hidden.len(),
            foreign: self.foreign.len(),
        };
        info!(
            rows = report.rows,
            peak_arcs = report.peak_arc_count,
            keyframes = report.keyframes,
            "rebuilt lane graph"
        );
        report
    }

    /// Splices `commits` onto the current graph.
    ///
    /// Commits are fed until an equilibrium is found; the rest of the new
    /// sequence is assumed to match the old graph below it.
    #[instrument(skip_all, fields(commits = commits.len()))]
    pub fn refresh(&mut self, mut commits: Vec<CommitRecord>, refs: &RefSet) -> RefreshReport {
        let graph_config = self.config.graph_config();
        let old_graph = std::mem::replace(
            &mut self.graph,
            Graph::new(self.allocator.clone(), graph_config),
        );
        let new_heads = refs.heads();
        let mut splicer = GraphSplicer::new(
            old_graph,
            self.heads.iter().copied(),
            new_heads.iter().copied(),
            &self.allocator,
            graph_config,
        );
        let mut commits_fed = 0;
        for commit in &commits {
            commits_fed += 1;
            if splicer.splice_new_commit(commit) == SpliceStep::Equilibrium {
                break;
            }
        }
        let outcome = splicer.finish();

        match outcome.equilibrium {
            Some(found) => {
                let tail = self.sequence.split_off((found.old_row + 1).min(self.sequence.len()));
                commits.truncate(found.new_row + 1);
                commits.extend(tail);
            }
            None => debug!("refresh found no equilibrium; graph replaced"),
        }
        self.sequence = commits;
        self.graph = outcome.graph;
        self.heads = new_heads;
        self.recompute_flags(refs);

        let report = RefreshReport {
            equilibrium: outcome.equilibrium,
            commits_fed,
            rows_added: outcome.rows_added,
            rows_removed: outcome.rows_removed,
            removed_commits: outcome.removed_commits,
            rows: self.graph.len(),
            hidden: self.hidden.len(),
            foreign: self.foreign.len(),
        };
        info!(
            rows = report.rows,
            fed = report.commits_fed,
            added = report.rows_added,
            removed = report.rows_removed,
            spliced = report.equilibrium.is_some(),
            "refreshed lane graph"
        );
        report
    }

    fn recompute_flags(&mut self, refs: &RefSet) {
        let mut hidden = GraphTrickle::hidden_commits(refs.hidden_targets(), refs.visible_targets());
        let hidden_fed = hidden.stabilize(&self.sequence);
        let mut foreign =
            GraphTrickle::foreign_commits(refs.local_targets(), refs.non_local_targets());
        let foreign_fed = foreign.stabilize(&self.sequence);
        debug!(hidden_fed, foreign_fed, "flag trickles settled");
        self.hidden = hidden.into_flagged();
        self.foreign = foreign.into_flagged();
    }
}
