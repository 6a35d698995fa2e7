// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Lane chains: maximal runs of arcs that share a lane across rows.
//!
//! A chain records the row where it starts (`top`) and, once known, the row
//! where it ends (`bottom`). Splicing merges a chain of the old graph into the
//! matching chain of the new prefix by turning the old record into an alias.
//! Arcs keep pointing at whichever record they were created with, so every
//! read goes through [`ChainArena::resolve`].
//!
//! # Invariants
//!
//! - Alias paths are acyclic and end at a record with `alias == None`.
//! - `top` is always defined on a root record.

// Chain ids are u32; a graph never opens 2^32 chains.
#![allow(clippy::cast_possible_truncation)]

use crate::batch::BatchRow;

/// Identifier of a chain record within one graph.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainId(u32);

impl ChainId {
    /// Raw index of this chain within its arena.
    pub const fn index(self) -> u32 {
        self.0
    }

    pub(crate) const fn offset(self, by: u32) -> Self {
        Self(self.0 + by)
    }
}

/// Start/end rows of a chain, or a redirection to the chain it merged into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainRecord {
    /// Row where the chain starts.
    pub top: BatchRow,
    /// Row where the chain ends; `None` while it is still open.
    pub bottom: Option<BatchRow>,
    alias: Option<ChainId>,
}

impl ChainRecord {
    /// Chain this record was merged into, if any.
    pub fn alias(&self) -> Option<ChainId> {
        self.alias
    }
}

/// Arena of chain records owned by a graph.
#[derive(Clone, Debug, Default)]
pub struct ChainArena {
    records: Vec<ChainRecord>,
}

impl ChainArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new chain starting at `top`.
    pub fn open(&mut self, top: BatchRow) -> ChainId {
        let id = ChainId(self.records.len() as u32);
        self.records.push(ChainRecord {
            top,
            bottom: None,
            alias: None,
        });
        id
    }

    fn record(&self, id: ChainId) -> &ChainRecord {
        &self.records[id.0 as usize]
    }

    fn record_mut(&mut self, id: ChainId) -> &mut ChainRecord {
        &mut self.records[id.0 as usize]
    }

    /// Follows aliases to the root record of `id` without modifying the arena.
    pub fn resolve(&self, id: ChainId) -> ChainId {
        let mut current = id;
        while let Some(next) = self.record(current).alias {
            current = next;
        }
        current
    }

    /// Follows aliases to the root of `id`, pointing every visited record
    /// directly at the root.
    pub fn resolve_mut(&mut self, id: ChainId) -> ChainId {
        let root = self.resolve(id);
        let mut current = id;
        while let Some(next) = self.record(current).alias {
            self.record_mut(current).alias = Some(root);
            current = next;
        }
        root
    }

    /// Root record of `id`.
    pub fn get(&self, id: ChainId) -> &ChainRecord {
        self.record(self.resolve(id))
    }

    /// Start row of the chain `id` belongs to.
    pub fn top(&self, id: ChainId) -> BatchRow {
        self.get(id).top
    }

    /// End row of the chain `id` belongs to.
    pub fn bottom(&self, id: ChainId) -> Option<BatchRow> {
        self.get(id).bottom
    }

    /// Marks the chain `id` belongs to as ending at `bottom`.
    pub fn close(&mut self, id: ChainId, bottom: BatchRow) {
        let root = self.resolve_mut(id);
        self.record_mut(root).bottom = Some(bottom);
    }

    /// Copies the bottom of `from`'s chain onto `onto`'s chain.
    pub fn transplant_bottom(&mut self, from: ChainId, onto: ChainId) {
        let bottom = self.bottom(from);
        let root = self.resolve_mut(onto);
        self.record_mut(root).bottom = bottom;
    }

    /// Redirects `from`'s chain into `onto`'s chain.
    pub fn alias(&mut self, from: ChainId, onto: ChainId) {
        let source = self.resolve_mut(from);
        let target = self.resolve_mut(onto);
        if source == target {
            return;
        }
        self.record_mut(source).alias = Some(target);
    }

    /// Compresses every alias path so each record points straight at its root.
    pub fn compress_all(&mut self) {
        for index in 0..self.records.len() {
            self.resolve_mut(ChainId(index as u32));
        }
    }

    /// Appends all records of `other`, renumbering its aliases. Returns the
    /// offset added to `other`'s chain ids.
    pub(crate) fn absorb(&mut self, other: ChainArena) -> u32 {
        let offset = self.records.len() as u32;
        self.records.extend(other.records.into_iter().map(|mut record| {
            record.alias = record.alias.map(|alias| alias.offset(offset));
            record
        }));
        offset
    }

    /// Number of records, aliased ones included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no chain has been opened.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchAllocator, BatchId};

    fn row(batch: BatchId, offset: u32) -> BatchRow {
        BatchRow::new(batch, offset)
    }

    #[test]
    fn alias_redirects_reads_to_target() {
        let batch = BatchAllocator::new().reserve_new_batch();
        let mut arena = ChainArena::new();
        let old = arena.open(row(batch, 4));
        let new = arena.open(row(batch, 1));
        arena.close(old, row(batch, 9));
        arena.transplant_bottom(old, new);
        arena.alias(old, new);
        assert_eq!(arena.resolve(old), new);
        assert_eq!(arena.top(old), row(batch, 1));
        assert_eq!(arena.bottom(old), Some(row(batch, 9)));
    }

    #[test]
    fn compress_all_flattens_long_paths() {
        let batch = BatchAllocator::new().reserve_new_batch();
        let mut arena = ChainArena::new();
        let ids: Vec<ChainId> = (0..4).map(|i| arena.open(row(batch, i))).collect();
        arena.alias(ids[0], ids[1]);
        arena.alias(ids[1], ids[2]);
        arena.alias(ids[2], ids[3]);
        arena.compress_all();
        for id in &ids[..3] {
            assert_eq!(arena.get(*id).top, row(batch, 3));
        }
        assert_eq!(arena.records[0].alias(), Some(ids[3]));
    }

    #[test]
    fn aliasing_a_chain_onto_itself_is_a_no_op() {
        let batch = BatchAllocator::new().reserve_new_batch();
        let mut arena = ChainArena::new();
        let a = arena.open(row(batch, 0));
        arena.alias(a, a);
        assert_eq!(arena.resolve(a), a);
    }

    #[test]
    fn absorb_renumbers_aliases() {
        let batch = BatchAllocator::new().reserve_new_batch();
        let mut base = ChainArena::new();
        base.open(row(batch, 0));
        let mut other = ChainArena::new();
        let x = other.open(row(batch, 1));
        let y = other.open(row(batch, 2));
        other.alias(x, y);
        let offset = base.absorb(other);
        assert_eq!(offset, 1);
        assert_eq!(base.resolve(x.offset(offset)), y.offset(offset));
    }
}
