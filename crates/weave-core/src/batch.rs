// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Batch-relative row addressing.
//!
//! Every row of a lane graph is addressed as a [`BatchRow`]: a batch id plus an
//! offset within that batch. A graph keeps a [`BatchShifts`] table that maps
//! each of its batches to an integer shift, so the integer row of a
//! `BatchRow` is `shift(batch) + offset`.
//!
//! Renumbering a whole graph (for instance after a splice inserts or removes
//! rows above it) is a single update of the shift table. Values stored in arcs,
//! chains and keyframes are never rewritten.
//!
//! # Invariants
//!
//! - Batch ids are unique among live batches of one [`BatchAllocator`].
//! - Within a graph, two distinct `BatchRow`s resolve to distinct integers.

// Offsets and batch ids are u32; row counts never approach 2^32 in practice.
#![allow(clippy::cast_possible_truncation)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;

/// Identifier of one batch of rows.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchId(u32);

impl BatchId {
    /// Raw index of this batch.
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Row address relative to a batch.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchRow {
    batch: BatchId,
    offset: u32,
}

impl BatchRow {
    /// Creates a row address.
    pub const fn new(batch: BatchId, offset: u32) -> Self {
        Self { batch, offset }
    }

    /// Batch this row belongs to.
    pub const fn batch(self) -> BatchId {
        self.batch
    }

    /// Offset of this row within its batch.
    pub const fn offset(self) -> u32 {
        self.offset
    }
}

// =============================================================================
// Allocator
// =============================================================================

/// Hands out batch ids and takes them back.
///
/// The allocator is a cheap, cloneable handle; every graph built within one
/// session shares it. Ids of freed batches are reused lowest first.
#[derive(Clone, Debug, Default)]
pub struct BatchAllocator {
    inner: Arc<Mutex<AllocatorSlots>>,
}

#[derive(Debug, Default)]
struct AllocatorSlots {
    next: u32,
    free: BTreeSet<u32>,
}

impl BatchAllocator {
    /// Creates an allocator with no live batches.
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, AllocatorSlots> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserves a fresh batch id.
    pub fn reserve_new_batch(&self) -> BatchId {
        let mut slots = self.slots();
        if let Some(id) = slots.free.pop_first() {
            return BatchId(id);
        }
        let id = slots.next;
        slots.next += 1;
        BatchId(id)
    }

    /// Returns a batch id to the allocator.
    pub fn free_batch(&self, batch: BatchId) {
        let mut slots = self.slots();
        debug_assert!(batch.0 < slots.next, "freeing unknown batch {batch:?}");
        let fresh = slots.free.insert(batch.0);
        debug_assert!(fresh, "batch {batch:?} freed twice");
    }

    /// Number of reserved batches not yet freed.
    pub fn live_batches(&self) -> usize {
        let slots = self.slots();
        slots.next as usize - slots.free.len()
    }
}

// =============================================================================
// Shift table
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BatchSpan {
    shift: i64,
    rows: u32,
}

/// Per-graph table mapping each owned batch to its shift and row count.
#[derive(Clone, Debug, Default)]
pub struct BatchShifts {
    spans: FxHashMap<BatchId, BatchSpan>,
}

impl BatchShifts {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `batch` with the given shift and no rows yet.
    pub fn insert(&mut self, batch: BatchId, shift: i64) {
        let previous = self.spans.insert(batch, BatchSpan { shift, rows: 0 });
        debug_assert!(previous.is_none(), "batch {batch:?} registered twice");
    }

    /// Allocates the next row of `batch`.
    pub fn next_row(&mut self, batch: BatchId) -> BatchRow {
        let span = self.spans.entry(batch).or_insert(BatchSpan { shift: 0, rows: 0 });
        let row = BatchRow::new(batch, span.rows);
        span.rows += 1;
        row
    }

    /// Integer row of `row`, or `None` if its batch is not in this table.
    pub fn try_resolve(&self, row: BatchRow) -> Option<usize> {
        let span = self.spans.get(&row.batch)?;
        usize::try_from(span.shift + i64::from(row.offset)).ok()
    }

    /// Integer row of `row`.
    ///
    /// Rows of batches this table does not own resolve past every live row.
    pub fn resolve(&self, row: BatchRow) -> usize {
        self.try_resolve(row).unwrap_or(usize::MAX)
    }

    /// Adds `delta` to the shift of every batch.
    pub fn shift_batches(&mut self, delta: i64) {
        for span in self.spans.values_mut() {
            span.shift += delta;
        }
    }

    /// Shift currently applied to `batch`.
    pub fn shift_of(&self, batch: BatchId) -> Option<i64> {
        self.spans.get(&batch).map(|span| span.shift)
    }

    /// Ids of all batches in the table, ascending.
    pub fn batches(&self) -> Vec<BatchId> {
        let mut ids: Vec<BatchId> = self.spans.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Removes and returns every batch whose rows all resolve at or before
    /// `last_dead_row`.
    pub fn drain_rows_through(&mut self, last_dead_row: usize) -> Vec<BatchId> {
        let limit = i64::try_from(last_dead_row).unwrap_or(i64::MAX);
        let mut dead: Vec<BatchId> = self
            .spans
            .iter()
            .filter(|(_, span)| span.shift + i64::from(span.rows) - 1 <= limit)
            .map(|(id, _)| *id)
            .collect();
        dead.sort_unstable();
        for id in &dead {
            self.spans.remove(id);
        }
        dead
    }

    /// Removes and returns every batch in the table.
    pub fn drain(&mut self) -> Vec<BatchId> {
        let ids = self.batches();
        self.spans.clear();
        ids
    }

    /// Moves all of `other`'s batches into this table.
    pub fn absorb(&mut self, other: &mut BatchShifts) {
        for (id, span) in other.spans.drain() {
            let previous = self.spans.insert(id, span);
            debug_assert!(previous.is_none(), "batch {id:?} owned by two graphs");
        }
    }

    /// Number of batches in the table.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// True when the table owns no batch.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}
