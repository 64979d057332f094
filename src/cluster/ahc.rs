//! Agglomerative hierarchical clustering to a fixed number of groups.
//!
//! Bottom-up: every point starts as its own cluster, and the two closest
//! clusters are merged until `k` remain. "Closest" is decided by the
//! [`Linkage`] rule over a pluggable [`Dissimilarity`].
//!
//! # Cost
//!
//! The reference strategy keeps every live pair in a flat pool and rebuilds
//! it after each merge: `O(M²)` per step plus the linkage work, `O(n³)`
//! overall, and `O(n²)` memory for the optional distance matrix. Fine for
//! the few thousand streamlines this is meant for.

use super::engine::MergeEngine;
use super::finalize::{finalize, ClusteringResult};
use super::linkage::Linkage;
use super::traits::Clustering;
use crate::config::AhcConfig;
use crate::context::ClusteringContext;
use crate::dissimilarity::{Dissimilarity, FeatureMetric, NormOption};
use crate::error::{Error, Result};
use ndarray::ArrayView2;
use std::time::Instant;
use tracing::info;

/// Agglomerative hierarchical clustering.
#[derive(Debug, Clone)]
pub struct Ahc {
    config: AhcConfig,
}

impl Ahc {
    /// Create a new clusterer targeting `n_clusters` groups.
    pub fn new(n_clusters: usize) -> Self {
        Self {
            config: AhcConfig::new(n_clusters),
        }
    }

    /// Create from a full configuration.
    pub fn from_config(config: AhcConfig) -> Self {
        Self { config }
    }

    /// Set linkage method.
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.config.linkage = linkage;
        self
    }

    /// Set the norm used by [`Ahc::fit_features`].
    pub fn with_norm(mut self, norm: NormOption) -> Self {
        self.config.norm = norm;
        self
    }

    /// Enable or disable the precomputed distance matrix.
    pub fn with_precompute(mut self, precompute: bool) -> Self {
        self.config.precompute = precompute;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &AhcConfig {
        &self.config
    }

    /// Cluster the rows of `features` using the dissimilarity held by `ctx`.
    ///
    /// `features` must have one row per point known to `ctx`. If the
    /// configuration asks for it and `ctx` has no cache yet, the distance
    /// matrix is built first. Stage timings and summary values are recorded
    /// in the context's diagnostics.
    pub fn fit<M: Dissimilarity>(
        &self,
        features: ArrayView2<'_, f32>,
        ctx: &mut ClusteringContext<M>,
    ) -> Result<ClusteringResult> {
        let n = ctx.n_items();
        self.config.validate(n)?;
        if features.nrows() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                found: features.nrows(),
            });
        }

        if self.config.precompute {
            ctx.precompute()?;
        }

        let k = self.config.n_clusters;
        let start = Instant::now();
        let (clusters, dendrogram) =
            MergeEngine::new(&*ctx, self.config.linkage, k)?.run()?;
        ctx.diagnostics_mut()
            .record(format!("hierarchical clustering for {k} groups"), start.elapsed());

        let start = Instant::now();
        let result = finalize(clusters, dendrogram, features, &*ctx)?;
        let diagnostics = ctx.diagnostics_mut();
        diagnostics.record("feature extraction", start.elapsed());
        diagnostics.note("linkage", self.config.linkage);
        diagnostics.note("clusters", result.n_clusters());
        diagnostics.note("entropy ratio", result.entropy_ratio());

        info!(
            n,
            k,
            linkage = %self.config.linkage,
            sizes = ?result.sizes(),
            entropy_ratio = result.entropy_ratio(),
            "agglomerative clustering finished"
        );
        Ok(result)
    }

    /// Cluster row vectors with the built-in [`FeatureMetric`] for the configured norm.
    pub fn fit_features(&self, data: &[Vec<f32>]) -> Result<ClusteringResult> {
        let metric = FeatureMetric::new(data, self.config.norm)?;
        let features = metric.features().to_owned();
        let mut ctx = ClusteringContext::new(metric);
        self.fit(features.view(), &mut ctx)
    }
}

impl Clustering for Ahc {
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<usize>> {
        Ok(self.fit_features(data)?.labels().to_vec())
    }

    fn n_clusters(&self) -> usize {
        self.config.n_clusters
    }
}
