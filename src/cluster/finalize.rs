//! Turning the engine's terminal clusters into consumable results.
//!
//! Clusters are ordered ascending by size, ties by ascending id. Every
//! downstream output (labels, centroid rows, representatives) is indexed by
//! that order.

use super::registry::{verify_partition, Cluster};
use crate::context::ClusteringContext;
use crate::dissimilarity::Dissimilarity;
use crate::error::{Error, Result};
use crate::hierarchy::Dendrogram;
use crate::metrics::entropy_ratio;
use ndarray::{Array1, Array2, ArrayView2};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Clusters in canonical `(size, id)` order, covering every point once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    clusters: Vec<Cluster>,
    n_items: usize,
}

impl Partition {
    /// Order `clusters` and check they partition `0..n_items`.
    pub fn new(mut clusters: Vec<Cluster>, n_items: usize) -> Result<Self> {
        verify_partition(n_items, clusters.iter())?;
        clusters.sort_by(|a, b| a.len().cmp(&b.len()).then(a.id().cmp(&b.id())));
        Ok(Self { clusters, n_items })
    }

    /// Clusters in canonical order.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Number of clusters.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Whether there are no clusters.
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Number of points covered.
    pub fn n_items(&self) -> usize {
        self.n_items
    }

    /// Cluster sizes in canonical order.
    pub fn sizes(&self) -> Vec<usize> {
        self.clusters.iter().map(Cluster::len).collect()
    }

    /// `labels[point]` = position of its cluster in canonical order.
    pub fn labels(&self) -> Vec<usize> {
        let mut labels = vec![0usize; self.n_items];
        for (g, cluster) in self.clusters.iter().enumerate() {
            for &p in cluster.members() {
                labels[p] = g;
            }
        }
        labels
    }

    /// Whether clusters are in `(size, id)` order.
    pub fn is_ordered(&self) -> bool {
        self.clusters
            .windows(2)
            .all(|w| (w[0].len(), w[0].id()) <= (w[1].len(), w[1].id()))
    }

    /// Consume into the ordered cluster list.
    pub fn into_clusters(self) -> Vec<Cluster> {
        self.clusters
    }
}

/// Members nearest to and furthest from a cluster's centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Representative {
    /// Point index closest to the centroid.
    pub closest: usize,
    /// Its distance to the centroid.
    pub closest_distance: f32,
    /// Point index furthest from the centroid.
    pub furthest: usize,
    /// Its distance to the centroid.
    pub furthest_distance: f32,
}

/// Everything a run hands to downstream consumers.
#[derive(Debug, Clone)]
pub struct ClusteringResult {
    partition: Partition,
    labels: Vec<usize>,
    centroids: Array2<f32>,
    entropy_ratio: f64,
    representatives: Vec<Representative>,
    closest: Array2<f32>,
    furthest: Array2<f32>,
    dendrogram: Dendrogram,
}

impl ClusteringResult {
    /// Final clusters in canonical order.
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// One label per point, in `[0, n_clusters)`.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Number of final clusters.
    pub fn n_clusters(&self) -> usize {
        self.partition.len()
    }

    /// Cluster sizes in canonical order.
    pub fn sizes(&self) -> Vec<usize> {
        self.partition.sizes()
    }

    /// `n_clusters × D` matrix of member means.
    pub fn centroids(&self) -> &Array2<f32> {
        &self.centroids
    }

    /// Normalised entropy of the size distribution; `0.0` for one cluster.
    pub fn entropy_ratio(&self) -> f64 {
        self.entropy_ratio
    }

    /// Closest/furthest member per cluster.
    pub fn representatives(&self) -> &[Representative] {
        &self.representatives
    }

    /// Feature rows of each cluster's closest member.
    pub fn closest_vectors(&self) -> &Array2<f32> {
        &self.closest
    }

    /// Feature rows of each cluster's furthest member.
    pub fn furthest_vectors(&self) -> &Array2<f32> {
        &self.furthest
    }

    /// Merge history that produced this partition.
    pub fn dendrogram(&self) -> &Dendrogram {
        &self.dendrogram
    }
}

/// Order clusters, label points, and compute centroids, entropy and representatives.
pub fn finalize<M: Dissimilarity>(
    clusters: Vec<Cluster>,
    dendrogram: Dendrogram,
    features: ArrayView2<'_, f32>,
    ctx: &ClusteringContext<M>,
) -> Result<ClusteringResult> {
    let n = features.nrows();
    if n != ctx.n_items() {
        return Err(Error::DimensionMismatch {
            expected: ctx.n_items(),
            found: n,
        });
    }

    let partition = Partition::new(clusters, n)?;
    let labels = partition.labels();

    let d = features.ncols();
    let mut centroids = Array2::<f32>::zeros((partition.len(), d));
    for (g, cluster) in partition.clusters().iter().enumerate() {
        centroids
            .row_mut(g)
            .assign(&centroid(cluster.members(), features));
    }

    let representatives = representatives(&partition, &centroids, ctx)?;
    let mut closest = Array2::<f32>::zeros((partition.len(), d));
    let mut furthest = Array2::<f32>::zeros((partition.len(), d));
    for (g, rep) in representatives.iter().enumerate() {
        closest.row_mut(g).assign(&features.row(rep.closest));
        furthest.row_mut(g).assign(&features.row(rep.furthest));
    }

    let entropy_ratio = entropy_ratio(&partition.sizes());

    Ok(ClusteringResult {
        partition,
        labels,
        centroids,
        entropy_ratio,
        representatives,
        closest,
        furthest,
        dendrogram,
    })
}

/// Elementwise mean of the member rows.
fn centroid(members: &[usize], features: ArrayView2<'_, f32>) -> Array1<f32> {
    let d = features.ncols();

    #[cfg(feature = "parallel")]
    let sum = members
        .par_iter()
        .fold(
            || Array1::<f32>::zeros(d),
            |mut acc, &i| {
                acc += &features.row(i);
                acc
            },
        )
        .reduce(|| Array1::<f32>::zeros(d), |a, b| a + b);

    #[cfg(not(feature = "parallel"))]
    let sum = members.iter().fold(Array1::<f32>::zeros(d), |mut acc, &i| {
        acc += &features.row(i);
        acc
    });

    if members.is_empty() {
        sum
    } else {
        sum / members.len() as f32
    }
}

/// Per-cluster scan for the members closest to and furthest from the centroid.
fn representatives<M: Dissimilarity>(
    partition: &Partition,
    centroids: &Array2<f32>,
    ctx: &ClusteringContext<M>,
) -> Result<Vec<Representative>> {
    let scan = |(g, cluster): (usize, &Cluster)| -> Result<Representative> {
        let center = centroids.row(g).to_vec();
        let mut best: Option<Representative> = None;
        for &p in cluster.members() {
            let dist = ctx.to_point(&center, p)?;
            let rep = best.get_or_insert(Representative {
                closest: p,
                closest_distance: dist,
                furthest: p,
                furthest_distance: dist,
            });
            if dist < rep.closest_distance {
                rep.closest = p;
                rep.closest_distance = dist;
            }
            if dist > rep.furthest_distance {
                rep.furthest = p;
                rep.furthest_distance = dist;
            }
        }
        best.ok_or_else(|| Error::Invariant(format!("cluster {} has no members", cluster.id())))
    };

    #[cfg(feature = "parallel")]
    let reps = partition
        .clusters()
        .par_iter()
        .enumerate()
        .map(scan)
        .collect();

    #[cfg(not(feature = "parallel"))]
    let reps = partition.clusters().iter().enumerate().map(scan).collect();

    reps
}
