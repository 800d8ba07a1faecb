//! Sparse vector storage
//!
//! Two parallel arrays hold the stored positions and their values, with
//! `indices` strictly ascending. Positions not present are structural
//! zeros. Writing zero removes a slot; writing a non-zero value to an
//! absent position inserts it in sorted order.
//!
//! Mutation goes through `&mut self`, so the borrow checker already
//! gives every lookup-or-insert exclusive access. Shared `&self` reads
//! never touch the arrays' layout and are safe to run concurrently.

use linkern_core::{validate_count, validate_index, validate_sparse_parts, Result};

use crate::config::kernel_config;
use crate::provider::{backend, Element};

/// Capacity after one growth step, capped at `maximum`
///
/// Small arrays grow by fixed increments, large ones by a quarter of
/// their current capacity.
pub(crate) fn grown_capacity(capacity: usize, maximum: usize) -> usize {
    let delta = if capacity > 1024 {
        capacity / 4
    } else if capacity > 256 {
        512
    } else if capacity > 64 {
        128
    } else {
        32
    };
    capacity.saturating_add(delta).min(maximum)
}

/// Append `(index, value)` to parallel sparse arrays unless `value` is zero
#[inline]
pub(crate) fn push_non_zero<T: Element>(indices: &mut Vec<usize>, values: &mut Vec<T>, index: usize, value: T) {
    if !value.is_zero() {
        indices.push(index);
        values.push(value);
    }
}

/// Sorted index/value storage for a vector of `count` elements
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        try_from = "SparseParts<T>",
        bound(deserialize = "T: Element + serde::Deserialize<'de>")
    )
)]
pub struct SparseVector<T> {
    count: usize,
    indices: Vec<usize>,
    values: Vec<T>,
}

/// Unchecked wire form, validated through [`SparseVector::from_parts`]
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct SparseParts<T> {
    count: usize,
    indices: Vec<usize>,
    values: Vec<T>,
}

#[cfg(feature = "serde")]
impl<T: Element> TryFrom<SparseParts<T>> for SparseVector<T> {
    type Error = linkern_core::LinalgError;

    fn try_from(parts: SparseParts<T>) -> Result<Self> {
        Self::from_parts(parts.count, parts.indices, parts.values)
    }
}

impl<T: Element> SparseVector<T> {
    /// Create an all-zero sparse vector
    pub fn new(count: usize) -> Result<Self> {
        validate_count(count)?;
        Ok(Self {
            count,
            indices: Vec::new(),
            values: Vec::new(),
        })
    }

    /// Copy the non-zero entries of a dense slice
    pub fn from_slice(values: &[T]) -> Result<Self> {
        validate_count(values.len())?;
        let (indices, stored) = values
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_zero())
            .map(|(i, &v)| (i, v))
            .unzip();
        Ok(Self {
            count: values.len(),
            indices,
            values: stored,
        })
    }

    /// Take ownership of pre-built parts after validating them
    ///
    /// Stored zeros are dropped so that every slot holds a non-zero.
    pub fn from_parts(count: usize, indices: Vec<usize>, values: Vec<T>) -> Result<Self> {
        validate_count(count)?;
        validate_sparse_parts(count, &indices, values.len())?;
        let mut vector = Self {
            count,
            indices,
            values,
        };
        vector.drop_stored_zeros();
        Ok(vector)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Number of stored entries
    pub fn non_zero_count(&self) -> usize {
        self.indices.len()
    }

    /// Slots available before the arrays must grow
    pub fn capacity(&self) -> usize {
        self.indices.capacity().min(self.values.capacity())
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Locate `index` among the stored slots
    ///
    /// Returns `Ok(slot)` when stored, otherwise `Err(insertion_point)`.
    pub fn find(&self, index: usize) -> core::result::Result<usize, usize> {
        self.indices.binary_search(&index)
    }

    pub fn get(&self, index: usize) -> Result<T> {
        validate_index(index, self.count)?;
        Ok(self.get_unchecked(index))
    }

    pub(crate) fn get_unchecked(&self, index: usize) -> T {
        debug_assert!(index < self.count);
        match self.find(index) {
            Ok(slot) => self.values[slot],
            Err(_) => T::zero(),
        }
    }

    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        validate_index(index, self.count)?;
        self.set_unchecked(index, value);
        Ok(())
    }

    pub(crate) fn set_unchecked(&mut self, index: usize, value: T) {
        debug_assert!(index < self.count);
        match self.find(index) {
            Ok(slot) if value.is_zero() => self.remove_slot(slot),
            Ok(slot) => self.values[slot] = value,
            Err(_) if value.is_zero() => {}
            Err(slot) => self.insert_slot(slot, index, value),
        }
    }

    /// Insert at `slot`, shifting the tail right by one
    fn insert_slot(&mut self, slot: usize, index: usize, value: T) {
        if self.indices.len() == self.capacity() {
            let target = grown_capacity(self.capacity(), self.count);
            let additional = target.saturating_sub(self.indices.len()).max(1);
            self.indices.reserve_exact(additional);
            self.values.reserve_exact(additional);
        }
        self.indices.insert(slot, index);
        self.values.insert(slot, value);
    }

    /// Remove `slot`, compacting the tail
    fn remove_slot(&mut self, slot: usize) {
        self.indices.remove(slot);
        self.values.remove(slot);
        self.shrink_if_underused();
    }

    fn shrink_if_underused(&mut self) {
        let capacity = self.capacity();
        if capacity > kernel_config().sparse_shrink_threshold && self.indices.len() < capacity / 2 {
            self.indices.shrink_to_fit();
            self.values.shrink_to_fit();
        }
    }

    /// Drop every stored entry
    pub fn clear(&mut self) {
        self.indices.clear();
        self.values.clear();
        self.shrink_if_underused();
    }

    /// Remove slots whose value became zero
    pub(crate) fn drop_stored_zeros(&mut self) {
        if self.values.iter().all(|v| !v.is_zero()) {
            return;
        }
        let mut write = 0;
        for read in 0..self.values.len() {
            if !self.values[read].is_zero() {
                self.indices[write] = self.indices[read];
                self.values[write] = self.values[read];
                write += 1;
            }
        }
        self.indices.truncate(write);
        self.values.truncate(write);
        self.shrink_if_underused();
    }

    /// Apply `f(index, value)` to every stored value, then drop resulting zeros
    pub(crate) fn map_stored(&mut self, f: impl Fn(usize, T) -> T) {
        for (value, &index) in self.values.iter_mut().zip(&self.indices) {
            *value = f(index, *value);
        }
        self.drop_stored_zeros();
    }

    /// Iterate stored `(index, value)` pairs in ascending index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, T)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Expand into a dense array of `count` elements
    pub fn to_dense_vec(&self) -> Vec<T> {
        let mut dense = vec![T::zero(); self.count];
        for (index, value) in self.iter() {
            dense[index] = value;
        }
        dense
    }

    /// Multiply stored values by `factor`
    pub fn scale_in_place(&mut self, factor: T) {
        if factor.is_zero() {
            self.clear();
            return;
        }
        backend::<T>().scale(&mut self.values, factor);
        self.drop_stored_zeros();
    }

    /// Two-pointer merge of `a` and `b` with `op`
    ///
    /// Absent entries enter `op` as zero; zero results are not stored.
    pub fn merge(a: &Self, b: &Self, op: impl Fn(T, T) -> T) -> Self {
        debug_assert_eq!(a.count, b.count);
        let mut indices = Vec::with_capacity(a.indices.len().max(b.indices.len()));
        let mut values = Vec::with_capacity(indices.capacity());

        let (mut i, mut j) = (0, 0);
        while i < a.indices.len() && j < b.indices.len() {
            let (ia, ib) = (a.indices[i], b.indices[j]);
            if ia < ib {
                push_non_zero(&mut indices, &mut values, ia, op(a.values[i], T::zero()));
                i += 1;
            } else if ib < ia {
                push_non_zero(&mut indices, &mut values, ib, op(T::zero(), b.values[j]));
                j += 1;
            } else {
                push_non_zero(&mut indices, &mut values, ia, op(a.values[i], b.values[j]));
                i += 1;
                j += 1;
            }
        }
        for k in i..a.indices.len() {
            push_non_zero(&mut indices, &mut values, a.indices[k], op(a.values[k], T::zero()));
        }
        for k in j..b.indices.len() {
            push_non_zero(&mut indices, &mut values, b.indices[k], op(T::zero(), b.values[k]));
        }

        Self {
            count: a.count,
            indices,
            values,
        }
    }

    /// Entries stored in both `a` and `b`, combined with `op`
    pub fn intersect(a: &Self, b: &Self, op: impl Fn(T, T) -> T) -> Self {
        debug_assert_eq!(a.count, b.count);
        let mut indices = Vec::new();
        let mut values = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < a.indices.len() && j < b.indices.len() {
            let (ia, ib) = (a.indices[i], b.indices[j]);
            if ia < ib {
                i += 1;
            } else if ib < ia {
                j += 1;
            } else {
                push_non_zero(&mut indices, &mut values, ia, op(a.values[i], b.values[j]));
                i += 1;
                j += 1;
            }
        }
        Self {
            count: a.count,
            indices,
            values,
        }
    }

    /// Verify the sorted-index invariant
    pub fn check_invariants(&self) -> Result<()> {
        validate_sparse_parts(self.count, &self.indices, self.values.len())
    }
}
