//! Merge-history structures.
//!
//! - [`Dendrogram`]: the sequence of merges an agglomerative run performed,
//!   replayable to any coarser partition the run passed through.

mod dendrogram;

pub use dendrogram::{Dendrogram, Merge};
