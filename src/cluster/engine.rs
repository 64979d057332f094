//! The agglomerative merge loop.
//!
//! ```text
//! Initialized --step--> Merging --step--> ... --step--> Done
//!                   \                \
//!                    +-- error -------+--> Failed
//! ```
//!
//! Each step takes the minimum edge from the [`DistancePool`], merges its two
//! clusters in the [`ClusterRegistry`] under the next sequential id, and
//! rebuilds the pool with linkage distances from the new cluster. Every step
//! removes exactly one live cluster, so reaching `k` clusters from `n` points
//! takes exactly `n - k` steps.
//!
//! Steps are strictly sequential; only the cross-pair work inside a single
//! linkage evaluation runs in parallel.

use super::linkage::Linkage;
use super::pool::{pair_count, DistancePool};
use super::registry::{Cluster, ClusterRegistry};
use crate::config::check_cluster_count;
use crate::context::ClusteringContext;
use crate::dissimilarity::Dissimilarity;
use crate::error::{Error, Result};
use crate::hierarchy::Dendrogram;
use tracing::debug;

/// Engine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Singletons and the full pool are built; nothing merged yet.
    Initialized,
    /// At least one merge done, target not yet reached.
    Merging,
    /// Live cluster count equals the target.
    Done,
    /// A step returned an error; registry and pool may disagree.
    Failed,
}

/// Outcome of one merge step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeStep {
    /// Absorbed cluster with the smaller id; its members come first.
    pub first: usize,
    /// Absorbed cluster with the larger id.
    pub second: usize,
    /// Id of the new cluster.
    pub merged: usize,
    /// Linkage distance at which the merge happened.
    pub distance: f32,
    /// Size of the new cluster.
    pub size: usize,
    /// Live clusters after the merge.
    pub live: usize,
}

/// Agglomerative merge engine over a clustering context.
#[derive(Debug)]
pub struct MergeEngine<'a, M> {
    ctx: &'a ClusteringContext<M>,
    linkage: Linkage,
    target: usize,
    registry: ClusterRegistry,
    pool: DistancePool,
    state: EngineState,
    dendrogram: Dendrogram,
}

impl<'a, M: Dissimilarity> MergeEngine<'a, M> {
    /// Build singletons and the initial pool.
    ///
    /// Fails with a configuration error unless `n >= 2` and `1 <= target < n`.
    pub fn new(ctx: &'a ClusteringContext<M>, linkage: Linkage, target: usize) -> Result<Self> {
        let n = ctx.n_items();
        check_cluster_count(n, target)?;

        let pool = DistancePool::initialize(n, |a, b| ctx.pair(a, b))?;
        debug!(n, target, edges = pool.len(), %linkage, "merge engine initialized");

        Ok(Self {
            ctx,
            linkage,
            target,
            registry: ClusterRegistry::singletons(n),
            pool,
            state: EngineState::Initialized,
            dendrogram: Dendrogram::new(n),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Requested number of clusters.
    pub fn target(&self) -> usize {
        self.target
    }

    /// Linkage in use.
    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Current live clusters.
    pub fn registry(&self) -> &ClusterRegistry {
        &self.registry
    }

    /// Current distance pool.
    pub fn pool(&self) -> &DistancePool {
        &self.pool
    }

    /// Merges performed so far.
    pub fn dendrogram(&self) -> &Dendrogram {
        &self.dendrogram
    }

    /// Perform one merge. Returns `None` once the target is reached.
    ///
    /// After any error the engine is [`EngineState::Failed`] and every later
    /// call returns an invariant error.
    pub fn step(&mut self) -> Result<Option<MergeStep>> {
        match self.state {
            EngineState::Done => return Ok(None),
            EngineState::Failed => {
                return Err(Error::Invariant("merge engine failed on an earlier step".into()))
            }
            EngineState::Initialized | EngineState::Merging => {}
        }
        let step = self.merge_minimum();
        if step.is_err() {
            self.state = EngineState::Failed;
        }
        step
    }

    fn merge_minimum(&mut self) -> Result<Option<MergeStep>> {
        let edge = self
            .pool
            .find_minimum()
            .ok_or_else(|| Error::Invariant("distance pool is empty".into()))?;
        let merged = self.registry.merge(edge.first, edge.second)?;
        let live = self.registry.len();

        let ctx = self.ctx;
        let linkage = self.linkage;
        let registry = &self.registry;
        let merged_members = registry
            .get(merged)
            .map(Cluster::members)
            .ok_or_else(|| Error::Invariant(format!("merged cluster {merged} missing")))?;
        let survivors = registry.iter().map(Cluster::id).filter(|&id| id != merged);

        let size = merged_members.len();
        self.pool.rebuild_after_merge((edge.first, edge.second), merged, live, survivors, |other| {
            let members = registry
                .get(other)
                .map(Cluster::members)
                .ok_or_else(|| Error::Invariant(format!("survivor {other} missing")))?;
            linkage.evaluate(merged_members, members, ctx)
        })?;

        self.check_invariants()?;

        self.dendrogram
            .add_merge(edge.first, edge.second, merged, edge.distance, size);
        let step = MergeStep {
            first: edge.first,
            second: edge.second,
            merged,
            distance: edge.distance,
            size,
            live,
        };
        debug!(
            first = step.first,
            second = step.second,
            merged = step.merged,
            distance = step.distance,
            live,
            "merged clusters"
        );

        self.state = if live == self.target {
            EngineState::Done
        } else {
            EngineState::Merging
        };
        Ok(Some(step))
    }

    /// Merge until the target is reached; yields the live clusters (ascending id)
    /// and the merge history.
    pub fn run(mut self) -> Result<(Vec<Cluster>, Dendrogram)> {
        while self.step()?.is_some() {}

        if self.registry.len() != self.target {
            return Err(Error::Invariant(format!(
                "stopped with {} clusters, expected {}",
                self.registry.len(),
                self.target
            )));
        }
        Ok((self.registry.into_clusters(), self.dendrogram))
    }

    fn check_invariants(&self) -> Result<()> {
        let expected = pair_count(self.registry.len());
        if self.pool.len() != expected {
            return Err(Error::Invariant(format!(
                "pool holds {} edges for {} clusters",
                self.pool.len(),
                self.registry.len()
            )));
        }
        self.registry.verify_partition()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dissimilarity::{FeatureMetric, NormOption};
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx(points: &[f32]) -> ClusteringContext<FeatureMetric> {
        let data: Vec<Vec<f32>> = points.iter().map(|&p| vec![p]).collect();
        ClusteringContext::new(FeatureMetric::new(&data, NormOption::Euclidean).unwrap())
    }

    fn sorted(members: &[usize]) -> Vec<usize> {
        let mut v = members.to_vec();
        v.sort_unstable();
        v
    }

    #[test]
    fn test_line_scenario_single_linkage() {
        let c = ctx(&[0.0, 1.0, 5.0, 6.0]);
        let mut engine = MergeEngine::new(&c, Linkage::Single, 2).unwrap();
        assert_eq!(engine.state(), EngineState::Initialized);
        assert_eq!(engine.pool().len(), 6);

        let s1 = engine.step().unwrap().unwrap();
        assert_eq!((s1.first, s1.second, s1.merged), (0, 1, 4));
        assert_eq!(s1.distance, 1.0);
        assert_eq!(engine.state(), EngineState::Merging);
        assert_eq!(engine.pool().len(), 3);

        let s2 = engine.step().unwrap().unwrap();
        assert_eq!((s2.first, s2.second, s2.merged), (2, 3, 5));
        assert_eq!(engine.state(), EngineState::Done);
        assert!(engine.step().unwrap().is_none());

        let (clusters, dendro) = engine.run().unwrap();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members(), &[0, 1]);
        assert_eq!(clusters[1].members(), &[2, 3]);
        assert_eq!(dendro.n_merges(), 2);
    }

    #[test]
    fn test_identical_points_to_one_cluster() {
        let c = ctx(&[3.0; 5]);
        let mut engine = MergeEngine::new(&c, Linkage::Average, 1).unwrap();
        let mut steps = 0;
        while let Some(step) = engine.step().unwrap() {
            steps += 1;
            assert_eq!(step.distance, 0.0);
            assert_eq!(step.live, 5 - steps);
        }
        assert_eq!(steps, 4);
        let (clusters, _) = engine.run().unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(sorted(clusters[0].members()), vec![0, 1, 2, 3, 4]);
        assert_eq!(clusters[0].id(), 8);
    }

    #[test]
    fn test_invariants_hold_every_step() {
        let c = ctx(&[0.0, 0.3, 2.0, 2.2, 7.0, 7.5, 7.6, 12.0]);
        for linkage in [Linkage::Single, Linkage::Complete, Linkage::Average] {
            let mut engine = MergeEngine::new(&c, linkage, 1).unwrap();
            let mut next_id = 8;
            while let Some(step) = engine.step().unwrap() {
                assert_eq!(step.merged, next_id);
                next_id += 1;
                let m = engine.registry().len();
                assert_eq!(engine.pool().len(), m * (m - 1) / 2);
                engine.registry().verify_partition().unwrap();
            }
        }
    }

    #[test]
    fn test_invalid_target() {
        let c = ctx(&[0.0, 1.0, 2.0]);
        for target in [0, 3, 10] {
            let err = MergeEngine::new(&c, Linkage::Single, target).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }
        let lone = ctx(&[1.0]);
        assert!(MergeEngine::new(&lone, Linkage::Single, 1).is_err());
    }

    /// Line metric that turns NaN once `budget` evaluations are spent.
    #[derive(Debug)]
    struct Exhausting {
        points: Vec<f32>,
        budget: usize,
        calls: AtomicUsize,
    }

    impl Dissimilarity for Exhausting {
        fn n_items(&self) -> usize {
            self.points.len()
        }

        fn dissimilarity(&self, a: usize, b: usize) -> f32 {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.budget {
                return f32::NAN;
            }
            (self.points[a] - self.points[b]).abs()
        }

        fn distance_to(&self, query: &[f32], index: usize) -> f32 {
            (query[0] - self.points[index]).abs()
        }
    }

    #[test]
    fn test_failed_rebuild_poisons_engine() {
        // The 6 initial pairs succeed; the first rebuild sees NaN after the registry merged.
        let c = ClusteringContext::new(Exhausting {
            points: vec![0.0, 1.0, 5.0, 6.0],
            budget: 6,
            calls: AtomicUsize::new(0),
        });
        let mut engine = MergeEngine::new(&c, Linkage::Single, 1).unwrap();
        let err = engine.step().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NumericAnomaly);
        assert_eq!(engine.state(), EngineState::Failed);

        let err = engine.step().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invariant);
        assert_eq!(engine.state(), EngineState::Failed);
        assert_eq!(engine.run().unwrap_err().kind(), ErrorKind::Invariant);
    }

    #[test]
    fn test_merged_members_order() {
        // 1 and 2 merge first (id 3); then 0 joins: edge (0, 3) so 0's members lead.
        let c = ctx(&[0.0, 10.0, 10.5]);
        let engine = MergeEngine::new(&c, Linkage::Single, 1).unwrap();
        let (clusters, dendro) = engine.run().unwrap();
        assert_eq!(clusters[0].members(), &[0, 1, 2]);
        let merges: Vec<_> = dendro.merges().map(|m| (m.cluster_a, m.cluster_b)).collect();
        assert_eq!(merges, vec![(1, 2), (0, 3)]);
    }
}
