//! Live clusters and their members.

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// A cluster: an id plus the original point indices it contains.
///
/// Singletons carry the id of their only point (`0..N`); every merge gets the
/// next id from `N` upwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    id: usize,
    members: Vec<usize>,
}

impl Cluster {
    /// Create a cluster with explicit members.
    pub fn new(id: usize, members: Vec<usize>) -> Self {
        Self { id, members }
    }

    /// A cluster holding only point `index`, with id `index`.
    pub fn singleton(index: usize) -> Self {
        Self::new(index, vec![index])
    }

    /// Concatenate `first`'s members followed by `second`'s under a new id.
    pub fn merged(id: usize, first: &Cluster, second: &Cluster) -> Self {
        let mut members = Vec::with_capacity(first.len() + second.len());
        members.extend_from_slice(&first.members);
        members.extend_from_slice(&second.members);
        Self { id, members }
    }

    /// Cluster id.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Member point indices, in merge order.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Member count.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the cluster has no members. Never true for engine-built clusters.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Authoritative map from cluster id to cluster for the current partition.
///
/// Iteration is in ascending id order.
#[derive(Debug, Clone)]
pub struct ClusterRegistry {
    clusters: BTreeMap<usize, Cluster>,
    n_items: usize,
    next_id: usize,
}

impl ClusterRegistry {
    /// `n` singleton clusters with ids `0..n`.
    pub fn singletons(n: usize) -> Self {
        Self {
            clusters: (0..n).map(|i| (i, Cluster::singleton(i))).collect(),
            n_items: n,
            next_id: n,
        }
    }

    /// Number of live clusters.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Whether no cluster is live.
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Number of original points.
    pub fn n_items(&self) -> usize {
        self.n_items
    }

    /// Id the next merge will receive.
    pub fn next_id(&self) -> usize {
        self.next_id
    }

    /// Live cluster by id.
    pub fn get(&self, id: usize) -> Option<&Cluster> {
        self.clusters.get(&id)
    }

    /// Live clusters in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }

    /// Replace clusters `first` and `second` with their union; returns the new id.
    pub fn merge(&mut self, first: usize, second: usize) -> Result<usize> {
        if first == second {
            return Err(Error::Invariant(format!(
                "cannot merge cluster {first} with itself"
            )));
        }
        for id in [first, second] {
            if !self.clusters.contains_key(&id) {
                return Err(Error::Invariant(format!("cluster {id} is not live")));
            }
        }
        let (Some(a), Some(b)) = (self.clusters.remove(&first), self.clusters.remove(&second))
        else {
            return Err(Error::Invariant("registry changed during merge".into()));
        };

        let id = self.next_id;
        self.next_id += 1;
        self.clusters.insert(id, Cluster::merged(id, &a, &b));
        Ok(id)
    }

    /// Check that every point `0..n_items` appears in exactly one live cluster.
    pub fn verify_partition(&self) -> Result<()> {
        verify_partition(self.n_items, self.iter())
    }

    /// Consume the registry, yielding live clusters in ascending id order.
    pub fn into_clusters(self) -> Vec<Cluster> {
        self.clusters.into_values().collect()
    }
}

/// Partition check shared by the registry and the finalizer.
pub(crate) fn verify_partition<'a>(
    n_items: usize,
    clusters: impl IntoIterator<Item = &'a Cluster>,
) -> Result<()> {
    let mut seen = vec![false; n_items];
    let mut total = 0usize;
    for cluster in clusters {
        if cluster.is_empty() {
            return Err(Error::Invariant(format!(
                "cluster {} has no members",
                cluster.id()
            )));
        }
        for &p in cluster.members() {
            match seen.get_mut(p) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => {
                    return Err(Error::Invariant(format!(
                        "point {p} appears in more than one cluster"
                    )))
                }
                None => {
                    return Err(Error::Invariant(format!(
                        "point {p} is out of range for {n_items} items"
                    )))
                }
            }
            total += 1;
        }
    }
    if total != n_items {
        return Err(Error::Invariant(format!(
            "partition covers {total} of {n_items} points"
        )));
    }
    Ok(())
}
