//! Parallel processing of mesh cells that do not share any degree of freedom.
//!
//! The cells of a mesh are grouped into *colors*. Two cells of the same color never touch a common
//! index (typically a vertex), so their contributions to rows of a global system can be written
//! concurrently without synchronization. [`ParallelSliceAccess`] provides the (unsafe) shared
//! mutable access to the underlying storage needed for that.

pub mod coloring;
pub mod slice;

pub use slice::ParallelSliceAccess;

use polycdo_index::Adjacency;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A set of subsets of indices, in which the intersection of indices between any two subsets is
/// empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisjointSubsets {
    // Largest index present in any subset, used to check storage bounds before access.
    max_index: Option<usize>,
    // Indices may repeat within a subset, but never across two subsets.
    subsets: Adjacency,
    // One label per subset, usually the id of the cell that produced it.
    labels: Vec<usize>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SubsetsNotDisjointError;

impl fmt::Display for SubsetsNotDisjointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subsets share at least one index")
    }
}

impl std::error::Error for SubsetsNotDisjointError {}

impl DisjointSubsets {
    pub fn try_from_disjoint_subsets(subsets: Adjacency, labels: Vec<usize>) -> Result<Self, SubsetsNotDisjointError> {
        assert_eq!(subsets.len(), labels.len(), "Must have exactly one label per subset.");

        let mut max_index = None;
        let mut global_index_set = HashSet::new();
        let mut local_index_set = HashSet::new();

        for subset in subsets.iter() {
            local_index_set.clear();
            for &idx in subset {
                max_index = Some(max_index.map_or(idx, |m: usize| m.max(idx)));
                local_index_set.insert(idx);
            }

            for idx in &local_index_set {
                if !global_index_set.insert(*idx) {
                    return Err(SubsetsNotDisjointError);
                }
            }
        }

        Ok(Self {
            max_index,
            subsets,
            labels,
        })
    }

    /// # Safety
    ///
    /// The subsets must be pairwise disjoint and `max_index` must be the largest index present.
    pub unsafe fn from_disjoint_subsets_unchecked(
        subsets: Adjacency,
        labels: Vec<usize>,
        max_index: Option<usize>,
    ) -> Self {
        assert_eq!(subsets.len(), labels.len(), "Must have exactly one label per subset.");
        Self {
            max_index,
            subsets,
            labels,
        }
    }

    pub fn subsets(&self) -> &Adjacency {
        &self.subsets
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn max_index(&self) -> Option<usize> {
        self.max_index
    }

    /// Run `f` on every subset in parallel, handing each invocation a shared mutable access to
    /// `storage`.
    ///
    /// `f` receives the label of the subset, its indices and the access. Soundness requires
    /// that `f` only writes to storage records associated with the indices of its own subset.
    ///
    /// # Panics
    ///
    /// Panics if any subset holds an index out of bounds for `storage`.
    pub fn par_for_each_with_access<T, F>(&self, storage: &mut [T], f: F)
    where
        T: Send + Sync,
        F: Fn(usize, &[usize], &ParallelSliceAccess<'_, T>) + Send + Sync,
    {
        if let Some(max_index) = self.max_index {
            assert!(max_index < storage.len(), "Subsets contain indices out of bounds.");
        }
        let access = ParallelSliceAccess::new(storage);
        (0..self.len())
            .into_par_iter()
            .for_each(|i| f(self.labels[i], self.subsets.get(i), &access));
    }
}
