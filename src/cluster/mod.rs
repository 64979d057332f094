//! Agglomerative hierarchical clustering (AHC).
//!
//! Bottom-up: start with each point as its own cluster, repeatedly merge
//! the two closest clusters until the requested number `k` remains.
//!
//! ## Components
//!
//! | Piece | Type | Role |
//! |-------|------|------|
//! | Cluster registry | [`ClusterRegistry`] | id → members, the current partition |
//! | Distance pool | [`DistancePool`] | one edge per live pair, min lookup, rebuild |
//! | Linkage evaluator | [`Linkage`] | merged-vs-other distance from member pairs |
//! | Merge engine | [`MergeEngine`] | the `Initialized → Merging → Done` loop |
//! | Finalizer | [`finalize`] | ordering, labels, centroids, entropy, representatives |
//!
//! **Linkage methods** determine "distance between clusters":
//!
//! | Linkage | Distance | Effect |
//! |---------|----------|--------|
//! | Single | min(pairwise) | Chaining; elongated clusters |
//! | Complete | max(pairwise) | Compact, spherical clusters |
//! | Average | mean(pairwise) | Balanced compromise |
//!
//! ## Usage
//!
//! ```rust
//! use agglo::cluster::{Ahc, Clustering, Linkage};
//!
//! let data = vec![
//!     vec![0.0, 0.0],
//!     vec![0.1, 0.1],
//!     vec![10.0, 10.0],
//!     vec![10.1, 10.1],
//! ];
//!
//! let labels = Ahc::new(2)
//!     .with_linkage(Linkage::Complete)
//!     .fit_predict(&data)
//!     .unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//! ```

mod ahc;
mod engine;
mod finalize;
mod linkage;
mod pool;
mod registry;
mod traits;

pub use ahc::Ahc;
pub use engine::{EngineState, MergeEngine, MergeStep};
pub use finalize::{finalize, ClusteringResult, Partition, Representative};
pub use linkage::Linkage;
pub use pool::{pair_count, DistanceEdge, DistancePool};
pub use registry::{Cluster, ClusterRegistry};
pub use traits::Clustering;
