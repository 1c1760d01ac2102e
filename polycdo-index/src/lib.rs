//! Index relations between sets of mesh entities.
//!
//! An [`Adjacency`] maps every element `a` of a set `A` to an ordered list of elements of a
//! set `B`. It is stored as an offset array of length `|A| + 1` and a flat array of ids,
//! optionally accompanied by a parallel array of incidence signs (`±1`).
//!
//! [`AdjacencyView`] is the borrowed counterpart. It aliases the arrays of another relation
//! without owning them, and all the algorithms of this crate work on views.
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fmt::Debug;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjacency {
    offsets: Vec<usize>,
    ids: Vec<usize>,
    signs: Option<Vec<i8>>,
}

/// A borrowed, non-owning alias of the arrays of an index relation.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct AdjacencyView<'a> {
    offsets: &'a [usize],
    ids: &'a [usize],
    signs: Option<&'a [i8]>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidAdjacency {
    EmptyOffsets,
    /// The offset at the given position is smaller than its predecessor.
    DecreasingOffsets(usize),
    /// The last offset does not match the number of ids.
    LengthMismatch { last_offset: usize, n_ids: usize },
    /// The sign array does not have the same length as the id array.
    SignLengthMismatch { n_signs: usize, n_ids: usize },
}

impl fmt::Display for InvalidAdjacency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyOffsets => write!(f, "offset array must contain at least one entry"),
            Self::DecreasingOffsets(i) => write!(f, "offsets decrease at position {i}"),
            Self::LengthMismatch { last_offset, n_ids } => {
                write!(f, "last offset {last_offset} does not match the number of ids {n_ids}")
            }
            Self::SignLengthMismatch { n_signs, n_ids } => {
                write!(f, "{n_signs} signs given for {n_ids} ids")
            }
        }
    }
}

impl Error for InvalidAdjacency {}

impl Debug for Adjacency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.view(), f)
    }
}

impl<'a> Debug for AdjacencyView<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries((0..self.len()).map(|i| self.get(i))).finish()
    }
}

impl Default for Adjacency {
    fn default() -> Self {
        Self::new()
    }
}

impl Adjacency {
    /// An empty relation without any source entity.
    pub fn new() -> Self {
        Self {
            offsets: vec![0],
            ids: Vec::new(),
            signs: None,
        }
    }

    pub fn from_offsets_and_ids(offsets: Vec<usize>, ids: Vec<usize>) -> Result<Self, InvalidAdjacency> {
        validate(&offsets, ids.len(), None)?;
        Ok(Self {
            offsets,
            ids,
            signs: None,
        })
    }

    pub fn from_signed_parts(
        offsets: Vec<usize>,
        ids: Vec<usize>,
        signs: Vec<i8>,
    ) -> Result<Self, InvalidAdjacency> {
        validate(&offsets, ids.len(), Some(signs.len()))?;
        Ok(Self {
            offsets,
            ids,
            signs: Some(signs),
        })
    }

    /// Append the list of the next source entity.
    pub fn push(&mut self, list: &[usize]) {
        assert!(self.signs.is_none(), "Cannot push an unsigned list onto a signed relation");
        self.ids.extend_from_slice(list);
        self.offsets.push(self.ids.len());
    }

    /// Append the signed list of the next source entity.
    ///
    /// Pushing signed lists onto an empty relation turns it into a signed relation.
    pub fn push_signed(&mut self, list: &[usize], signs: &[i8]) {
        assert_eq!(list.len(), signs.len(), "Need exactly one sign per id");
        if self.signs.is_none() {
            assert!(self.ids.is_empty(), "Cannot push a signed list onto an unsigned relation");
            self.signs = Some(Vec::new());
        }
        self.ids.extend_from_slice(list);
        self.offsets.push(self.ids.len());
        if let Some(s) = &mut self.signs {
            s.extend_from_slice(signs);
        }
    }

    /// Attach incidence signs to an unsigned relation.
    pub fn with_signs(mut self, signs: Vec<i8>) -> Result<Self, InvalidAdjacency> {
        validate(&self.offsets, self.ids.len(), Some(signs.len()))?;
        self.signs = Some(signs);
        Ok(self)
    }

    pub fn view(&self) -> AdjacencyView<'_> {
        AdjacencyView {
            offsets: &self.offsets,
            ids: &self.ids,
            signs: self.signs.as_deref(),
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn n_entries(&self) -> usize {
        self.ids.len()
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    pub fn signs(&self) -> Option<&[i8]> {
        self.signs.as_deref()
    }

    pub fn is_signed(&self) -> bool {
        self.signs.is_some()
    }

    /// The list associated with the source entity `a`.
    ///
    /// # Panics
    ///
    /// Panics if `a` is out of bounds.
    pub fn get(&self, a: usize) -> &[usize] {
        &self.ids[self.offsets[a]..self.offsets[a + 1]]
    }

    pub fn get_signs(&self, a: usize) -> Option<&[i8]> {
        self.signs
            .as_ref()
            .map(|s| &s[self.offsets[a]..self.offsets[a + 1]])
    }

    pub fn range(&self, a: usize) -> std::ops::Range<usize> {
        self.offsets[a]..self.offsets[a + 1]
    }

    pub fn degree(&self, a: usize) -> usize {
        self.offsets[a + 1] - self.offsets[a]
    }

    pub fn max_degree(&self) -> usize {
        self.view().max_degree()
    }

    pub fn iter(&self) -> impl '_ + Iterator<Item = &[usize]> {
        (0..self.len()).map(move |a| self.get(a))
    }

    /// Iterate over all `(a, b)` pairs of the relation.
    pub fn pairs(&self) -> impl '_ + Iterator<Item = (usize, usize)> {
        (0..self.len()).flat_map(move |a| self.get(a).iter().map(move |&b| (a, b)))
    }

    pub fn transpose(&self, n_targets: usize) -> Adjacency {
        self.view().transpose(n_targets)
    }

    pub fn compose(&self, other: &Adjacency, n_targets: usize) -> Adjacency {
        self.view().compose(other.view(), n_targets)
    }

    /// Sort every list by id, permuting signs along.
    pub fn sort_lists(&mut self) {
        for a in 0..self.len() {
            let range = self.range(a);
            match &mut self.signs {
                Some(signs) => {
                    let mut pairs: Vec<_> = self.ids[range.clone()]
                        .iter()
                        .copied()
                        .zip(signs[range.clone()].iter().copied())
                        .collect();
                    pairs.sort_unstable_by_key(|&(id, _)| id);
                    for (k, (id, s)) in range.zip(pairs) {
                        self.ids[k] = id;
                        signs[k] = s;
                    }
                }
                None => self.ids[range].sort_unstable(),
            }
        }
    }

    /// Swap the entries at positions `i` and `j` of the list of `a`.
    pub fn swap_in_list(&mut self, a: usize, i: usize, j: usize) {
        let begin = self.offsets[a];
        self.ids.swap(begin + i, begin + j);
        if let Some(signs) = &mut self.signs {
            signs.swap(begin + i, begin + j);
        }
    }
}

impl<'a> AdjacencyView<'a> {
    /// Alias existing arrays as a relation.
    pub fn from_parts(
        offsets: &'a [usize],
        ids: &'a [usize],
        signs: Option<&'a [i8]>,
    ) -> Result<Self, InvalidAdjacency> {
        validate(offsets, ids.len(), signs.map(|s| s.len()))?;
        Ok(Self { offsets, ids, signs })
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, a: usize) -> &'a [usize] {
        &self.ids[self.offsets[a]..self.offsets[a + 1]]
    }

    pub fn get_signs(&self, a: usize) -> Option<&'a [i8]> {
        let (begin, end) = (self.offsets[a], self.offsets[a + 1]);
        self.signs.map(|s| &s[begin..end])
    }

    pub fn offsets(&self) -> &'a [usize] {
        self.offsets
    }

    pub fn ids(&self) -> &'a [usize] {
        self.ids
    }

    pub fn signs(&self) -> Option<&'a [i8]> {
        self.signs
    }

    pub fn max_degree(&self) -> usize {
        self.offsets
            .windows(2)
            .map(|w| w[1] - w[0])
            .max()
            .unwrap_or(0)
    }

    pub fn to_owned(&self) -> Adjacency {
        Adjacency {
            offsets: self.offsets.to_vec(),
            ids: self.ids.to_vec(),
            signs: self.signs.map(|s| s.to_vec()),
        }
    }

    /// Build `B -> A` from `A -> B`.
    ///
    /// In-degrees of the targets are counted first, then ids are scattered into place, so that
    /// the cost is linear in the number of entries. Signs are carried over and, within each
    /// target list, sources appear in increasing order.
    ///
    /// # Panics
    ///
    /// Panics if an id is not smaller than `n_targets`.
    pub fn transpose(&self, n_targets: usize) -> Adjacency {
        let mut offsets = vec![0usize; n_targets + 1];
        for &b in self.ids {
            assert!(b < n_targets, "Id {b} out of bounds for {n_targets} targets");
            offsets[b + 1] += 1;
        }
        for i in 0..n_targets {
            offsets[i + 1] += offsets[i];
        }

        let mut cursor = offsets[..n_targets].to_vec();
        let mut ids = vec![0usize; self.ids.len()];
        let mut signs = self.signs.map(|s| vec![0i8; s.len()]);

        for a in 0..self.len() {
            for k in self.offsets[a]..self.offsets[a + 1] {
                let b = self.ids[k];
                let pos = cursor[b];
                ids[pos] = a;
                if let (Some(out), Some(src)) = (&mut signs, self.signs) {
                    out[pos] = src[k];
                }
                cursor[b] += 1;
            }
        }

        Adjacency { offsets, ids, signs }
    }

    /// Build `A -> C` from `A -> B` (self) and `B -> C` (other).
    ///
    /// Every `C` id appears at most once in each list, in order of first discovery. A single tag
    /// array holds, for each `C` id, the last `A` index that listed it, so it never needs to be
    /// reset between lists. The result is unsigned.
    pub fn compose(&self, other: AdjacencyView<'_>, n_targets: usize) -> Adjacency {
        let mut tag = vec![usize::MAX; n_targets];
        let mut offsets = Vec::with_capacity(self.offsets.len());
        let mut ids = Vec::new();
        offsets.push(0);
        for a in 0..self.len() {
            for &b in self.get(a) {
                for &c in other.get(b) {
                    if tag[c] != a {
                        tag[c] = a;
                        ids.push(c);
                    }
                }
            }
            offsets.push(ids.len());
        }
        Adjacency {
            offsets,
            ids,
            signs: None,
        }
    }
}

fn validate(offsets: &[usize], n_ids: usize, n_signs: Option<usize>) -> Result<(), InvalidAdjacency> {
    let last = *offsets.last().ok_or(InvalidAdjacency::EmptyOffsets)?;
    if let Some(pos) = offsets.windows(2).position(|w| w[1] < w[0]) {
        return Err(InvalidAdjacency::DecreasingOffsets(pos + 1));
    }
    if last != n_ids || offsets[0] != 0 {
        return Err(InvalidAdjacency::LengthMismatch {
            last_offset: last,
            n_ids,
        });
    }
    if let Some(n_signs) = n_signs {
        if n_signs != n_ids {
            return Err(InvalidAdjacency::SignLengthMismatch { n_signs, n_ids });
        }
    }
    Ok(())
}

impl<'a> From<&'a Vec<Vec<usize>>> for Adjacency {
    fn from(lists: &'a Vec<Vec<usize>>) -> Self {
        let mut result = Self::new();
        for list in lists {
            result.push(list);
        }
        result
    }
}

impl From<Vec<Vec<usize>>> for Adjacency {
    fn from(lists: Vec<Vec<usize>>) -> Self {
        Self::from(&lists)
    }
}

impl<'a> From<&'a [Vec<usize>]> for Adjacency {
    fn from(lists: &'a [Vec<usize>]) -> Self {
        let mut result = Self::new();
        for list in lists {
            result.push(list);
        }
        result
    }
}

impl<'a> From<&'a Adjacency> for Vec<Vec<usize>> {
    fn from(adjacency: &'a Adjacency) -> Self {
        adjacency.iter().map(|list| list.to_vec()).collect()
    }
}
