//! # agglo
//!
//! Agglomerative hierarchical clustering of equal-length feature vectors
//! (trajectory and streamline descriptors) into a chosen number of groups.
//!
//! The pipeline:
//!
//! ```text
//! features ─► Dissimilarity ─► DistancePool ─► MergeEngine ─► finalize ─► ClusteringResult
//!                 │ (optional DistanceMatrix cache)   │ Linkage + ClusterRegistry
//! ```
//!
//! - [`dissimilarity`]: the pairwise metric contract, built-in norms, and the
//!   precomputed matrix cache.
//! - [`cluster`]: registry, pool, linkage, merge engine and finalizer.
//! - [`context`]: per-run state (metric, cache, diagnostics). Nothing is global.
//! - [`metrics`]: entropy of the final size distribution.
//!
//! Data-parallel reductions (linkage cross pairs, centroid sums,
//! representative scans, matrix build) use rayon behind the default
//! `parallel` feature.
//!
//! ```rust
//! use agglo::{Ahc, Linkage};
//!
//! let data: Vec<Vec<f32>> = [0.0, 1.0, 5.0, 6.0].iter().map(|&x| vec![x]).collect();
//! let result = Ahc::new(2)
//!     .with_linkage(Linkage::Single)
//!     .fit_features(&data)
//!     .unwrap();
//!
//! assert_eq!(result.labels(), &[0, 0, 1, 1]);
//! assert_eq!(result.sizes(), vec![2, 2]);
//! assert_eq!(result.entropy_ratio(), 1.0);
//! ```

pub mod cluster;
pub mod config;
pub mod context;
pub mod dissimilarity;
/// Error types used across `agglo`.
pub mod error;
pub mod hierarchy;
pub mod metrics;

pub use cluster::{
    Ahc, Cluster, ClusterRegistry, Clustering, ClusteringResult, DistanceEdge, DistancePool,
    EngineState, Linkage, MergeEngine, MergeStep, Partition, Representative,
};
pub use config::AhcConfig;
pub use context::{Activity, ClusteringContext, Diagnostics};
pub use dissimilarity::{Dissimilarity, DistanceMatrix, FeatureMetric, NormOption};
pub use error::{Error, ErrorKind, Result};
pub use hierarchy::{Dendrogram, Merge};
pub use metrics::{entropy_ratio, shannon_entropy};
