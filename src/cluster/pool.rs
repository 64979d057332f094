//! Pairwise distances between live clusters.
//!
//! The pool is a flat list of undirected edges, one per unordered pair of
//! live clusters, so its length is always `M*(M-1)/2`. Each merge rebuilds
//! it: edges that touch neither absorbed cluster are carried forward, and one
//! fresh edge is computed from the merged cluster to every survivor.
//!
//! # Tie-break
//!
//! [`DistancePool::find_minimum`] returns the least edge under the total
//! order `(distance, first, second)`, where `first < second`. The result does
//! not depend on the order edges are stored in.

use crate::error::{Error, Result};
use core::cmp::Ordering;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Distance between two live clusters. Always stored with `first < second`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceEdge {
    /// Smaller cluster id.
    pub first: usize,
    /// Larger cluster id.
    pub second: usize,
    /// Linkage distance.
    pub distance: f32,
}

impl DistanceEdge {
    /// Edge between `a` and `b`, normalised so that `first < second`.
    pub fn new(a: usize, b: usize, distance: f32) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self {
            first,
            second,
            distance,
        }
    }

    /// Whether this edge references cluster `id`.
    #[inline]
    pub fn touches(&self, id: usize) -> bool {
        self.first == id || self.second == id
    }

    /// Total order used for minimum selection.
    #[inline]
    pub fn order(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.first.cmp(&other.first))
            .then(self.second.cmp(&other.second))
    }
}

/// Number of unordered pairs among `m` clusters.
#[inline]
pub fn pair_count(m: usize) -> usize {
    m * m.saturating_sub(1) / 2
}

/// Edge set over the current live clusters.
#[derive(Debug, Clone, Default)]
pub struct DistancePool {
    edges: Vec<DistanceEdge>,
}

impl DistancePool {
    /// All `n*(n-1)/2` edges between singleton clusters `0..n`.
    ///
    /// Edges are laid out row by row: `(0,1), (0,2), ..., (1,2), ...`.
    pub fn initialize<F>(n: usize, distance: F) -> Result<Self>
    where
        F: Fn(usize, usize) -> Result<f32> + Sync,
    {
        if n < 2 {
            return Err(Error::invalid_parameter(
                "n_items",
                format!("need at least 2 items to cluster, got {n}"),
            ));
        }

        let row = |i: usize| -> Result<Vec<DistanceEdge>> {
            ((i + 1)..n)
                .map(|j| Ok(DistanceEdge::new(i, j, distance(i, j)?)))
                .collect()
        };

        #[cfg(feature = "parallel")]
        let rows: Vec<Vec<DistanceEdge>> = (0..n - 1)
            .into_par_iter()
            .map(row)
            .collect::<Result<_>>()?;
        #[cfg(not(feature = "parallel"))]
        let rows: Vec<Vec<DistanceEdge>> = (0..n - 1).map(row).collect::<Result<_>>()?;

        let edges: Vec<DistanceEdge> = rows.into_iter().flatten().collect();
        if edges.len() != pair_count(n) {
            return Err(Error::Invariant(format!(
                "initial pool has {} edges, expected {}",
                edges.len(),
                pair_count(n)
            )));
        }
        Ok(Self { edges })
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the pool is empty (a single live cluster).
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// All edges, in storage order.
    pub fn edges(&self) -> &[DistanceEdge] {
        &self.edges
    }

    /// Distance recorded between clusters `a` and `b`, if both are live.
    pub fn distance_between(&self, a: usize, b: usize) -> Option<f32> {
        let key = DistanceEdge::new(a, b, 0.0);
        self.edges
            .iter()
            .find(|e| e.first == key.first && e.second == key.second)
            .map(|e| e.distance)
    }

    /// Least edge under `(distance, first, second)`.
    pub fn find_minimum(&self) -> Option<DistanceEdge> {
        self.edges.iter().copied().min_by(|a, b| a.order(b))
    }

    /// Replace every edge touching `removed` with edges from `merged` to each survivor.
    ///
    /// `survivors` are the live clusters other than `merged`; `live` is the live
    /// count after the merge (survivors + 1). `distance` yields the linkage
    /// distance from `merged` to a given survivor id.
    pub fn rebuild_after_merge<I, F>(
        &mut self,
        removed: (usize, usize),
        merged: usize,
        live: usize,
        survivors: I,
        mut distance: F,
    ) -> Result<()>
    where
        I: IntoIterator<Item = usize>,
        F: FnMut(usize) -> Result<f32>,
    {
        let expected = pair_count(live);
        let mut next = Vec::with_capacity(expected);

        next.extend(
            self.edges
                .iter()
                .filter(|e| !e.touches(removed.0) && !e.touches(removed.1))
                .copied(),
        );

        for other in survivors {
            if other == merged || other == removed.0 || other == removed.1 {
                return Err(Error::Invariant(format!(
                    "cluster {other} listed as a survivor of merge into {merged}"
                )));
            }
            next.push(DistanceEdge::new(other, merged, distance(other)?));
        }

        if next.len() != expected {
            return Err(Error::Invariant(format!(
                "rebuilt pool has {} edges, expected {expected} for {live} clusters",
                next.len()
            )));
        }
        self.edges = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn line_distance(points: &'static [f32]) -> impl Fn(usize, usize) -> Result<f32> + Sync {
        move |a, b| Ok((points[a] - points[b]).abs())
    }

    #[test]
    fn test_initialize_layout() {
        let pool = DistancePool::initialize(4, line_distance(&[0.0, 1.0, 5.0, 6.0])).unwrap();
        assert_eq!(pool.len(), 6);
        let pairs: Vec<(usize, usize)> = pool.edges().iter().map(|e| (e.first, e.second)).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
        assert_eq!(pool.distance_between(3, 1), Some(5.0));
    }

    #[test]
    fn test_initialize_needs_two_items() {
        let err = DistancePool::initialize(1, line_distance(&[0.0])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_minimum_tie_break() {
        // (0,1) and (2,3) both at distance 1; the lexicographically smaller wins.
        let pool = DistancePool::initialize(4, line_distance(&[0.0, 1.0, 5.0, 6.0])).unwrap();
        let min = pool.find_minimum().unwrap();
        assert_eq!((min.first, min.second, min.distance), (0, 1, 1.0));

        let reversed = DistancePool {
            edges: pool.edges().iter().rev().copied().collect(),
        };
        assert_eq!(reversed.find_minimum(), Some(min));
    }

    #[test]
    fn test_rebuild_after_merge() {
        let mut pool = DistancePool::initialize(4, line_distance(&[0.0, 1.0, 5.0, 6.0])).unwrap();
        // Merge 0 and 1 into 4; survivors 2 and 3.
        pool.rebuild_after_merge((0, 1), 4, 3, [2, 3], |other| Ok(other as f32 * 10.0))
            .unwrap();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.distance_between(2, 3), Some(1.0));
        assert_eq!(pool.distance_between(2, 4), Some(20.0));
        assert_eq!(pool.distance_between(4, 3), Some(30.0));
        assert!(pool.distance_between(0, 2).is_none());
    }

    #[test]
    fn test_rebuild_size_mismatch_is_invariant_error() {
        let mut pool = DistancePool::initialize(4, line_distance(&[0.0, 1.0, 5.0, 6.0])).unwrap();
        let err = pool
            .rebuild_after_merge((0, 1), 4, 3, [2], |_| Ok(1.0))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invariant);
        // Pool is left untouched on failure.
        assert_eq!(pool.len(), 6);
    }

    #[test]
    fn test_rebuild_propagates_distance_errors() {
        let mut pool = DistancePool::initialize(3, line_distance(&[0.0, 1.0, 2.0])).unwrap();
        let err = pool
            .rebuild_after_merge((0, 1), 3, 2, [2], |_| {
                Err(Error::NumericAnomaly {
                    location: "test".into(),
                    value: f32::NAN,
                })
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NumericAnomaly);
    }
}
