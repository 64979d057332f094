//! Merge history of an agglomerative run.
//!
//! Merges are recorded in the order the engine performed them, using the
//! SciPy/MATLAB-style id convention: leaves are `0..n`, merge `i` creates
//! cluster `n + i`. Replaying a prefix of the history reproduces the
//! partition at any coarser-than-leaves level the run passed through.

use crate::cluster::{Cluster, Partition};
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// A dendrogram representing hierarchical cluster merges.
#[derive(Debug, Clone, Default)]
pub struct Dendrogram {
    merges: Vec<Merge>,
    n_items: usize,
}

/// A single merge operation in the dendrogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    /// First cluster being merged; its members lead in the result.
    pub cluster_a: usize,
    /// Second cluster being merged.
    pub cluster_b: usize,
    /// Id of the resulting cluster.
    pub merged: usize,
    /// Linkage distance at which the merge occurred.
    pub distance: f32,
    /// Size of the resulting cluster.
    pub size: usize,
}

impl Dendrogram {
    /// Empty history over `n_items` leaves.
    pub fn new(n_items: usize) -> Self {
        Self {
            merges: Vec::with_capacity(n_items.saturating_sub(1)),
            n_items,
        }
    }

    /// Record a merge operation.
    pub fn add_merge(
        &mut self,
        cluster_a: usize,
        cluster_b: usize,
        merged: usize,
        distance: f32,
        size: usize,
    ) {
        self.merges.push(Merge {
            cluster_a,
            cluster_b,
            merged,
            distance,
            size,
        });
    }

    /// Number of original items.
    pub fn n_items(&self) -> usize {
        self.n_items
    }

    /// Number of merges recorded.
    pub fn n_merges(&self) -> usize {
        self.merges.len()
    }

    /// Fewest clusters reachable by replaying this history.
    pub fn min_clusters(&self) -> usize {
        self.n_items - self.merges.len().min(self.n_items)
    }

    /// Iterate over merges.
    pub fn merges(&self) -> impl Iterator<Item = &Merge> {
        self.merges.iter()
    }

    /// Merge distances in merge order.
    pub fn distances(&self) -> Vec<f32> {
        self.merges.iter().map(|m| m.distance).collect()
    }

    /// Partition with `k` clusters, replaying the first `n - k` merges.
    ///
    /// `k` must lie in `[min_clusters(), n_items]`.
    pub fn partition_at(&self, k: usize) -> Result<Partition> {
        if k == 0 || k > self.n_items || k < self.min_clusters() {
            return Err(Error::InvalidClusterCount {
                requested: k,
                n_items: self.n_items,
            });
        }

        let mut live: BTreeMap<usize, Cluster> =
            (0..self.n_items).map(|i| (i, Cluster::singleton(i))).collect();
        for merge in self.merges.iter().take(self.n_items - k) {
            let (Some(a), Some(b)) = (live.remove(&merge.cluster_a), live.remove(&merge.cluster_b))
            else {
                return Err(Error::Invariant(format!(
                    "merge into {} references a dead cluster",
                    merge.merged
                )));
            };
            live.insert(merge.merged, Cluster::merged(merge.merged, &a, &b));
        }

        Partition::new(live.into_values().collect(), self.n_items)
    }

    /// Point labels for `k` clusters, in [`Partition`] order.
    pub fn labels_at(&self, k: usize) -> Result<Vec<usize>> {
        Ok(self.partition_at(k)?.labels())
    }
}
