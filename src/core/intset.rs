// --- File: src/core/intset.rs
use crate::core::types::RecordIndex;

/// A set of record indices drawn from `[0, max)`.
///
/// Sparse/dense layout (Briggs & Torczon): `dense` holds the members in
/// arbitrary order, `sparse[i]` holds the position of `i` in `dense`. A stale
/// `sparse` slot is harmless because membership is confirmed through `dense`.
/// Add, remove and contains are O(1); removal does not preserve order.
#[derive(Debug, Clone, Default)]
pub struct IntSet {
    dense: Vec<RecordIndex>,
    sparse: Vec<usize>,
}

impl IntSet {
    /// Creates an empty set that can hold integers up to `max` (exclusive).
    pub fn new(max: usize) -> Self {
        Self {
            dense: Vec::with_capacity(max),
            sparse: vec![0; max],
        }
    }

    /// Exclusive upper bound on members, fixed at construction.
    pub fn capacity(&self) -> usize {
        self.sparse.len()
    }

    /// Adds `i`. Does nothing if it is already a member or out of range.
    pub fn add(&mut self, i: RecordIndex) -> bool {
        if i >= self.sparse.len() || self.contains(i) {
            return false;
        }
        self.sparse[i] = self.dense.len();
        self.dense.push(i);
        true
    }

    /// Removes `i` and reports whether it was a member.
    pub fn remove(&mut self, i: RecordIndex) -> bool {
        if !self.contains(i) {
            return false;
        }
        let slot = self.sparse[i];
        let last = self.dense[self.dense.len() - 1];
        self.dense[slot] = last;
        self.sparse[last] = slot;
        self.dense.pop();
        true
    }

    pub fn contains(&self, i: RecordIndex) -> bool {
        match self.sparse.get(i) {
            Some(&slot) => slot < self.dense.len() && self.dense[slot] == i,
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Returns the k'th member in some arbitrary order.
    ///
    /// `at(0)` through `at(len() - 1)` are all the members.
    pub fn at(&self, k: usize) -> Option<RecordIndex> {
        self.dense.get(k).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = RecordIndex> + '_ {
        self.dense.iter().copied()
    }
}
