//! Inter-cluster distance from member-to-member dissimilarities.
//!
//! | Linkage | Option | Distance |
//! |---------|--------|----------|
//! | Single | 0 | min over the `m×n` cross pairs |
//! | Complete | 1 | max over the cross pairs |
//! | Average | 2 | sum over the cross pairs / `m*n` |
//!
//! All three are a map over the cross grid followed by a commutative
//! reduction, parallelised over rows of the grid when the `parallel` feature
//! is on. Min and max are exact regardless of reduction order. The average
//! is summed in `f64`; its last bits may still vary with thread scheduling.

use crate::context::ClusteringContext;
use crate::dissimilarity::Dissimilarity;
use crate::error::{Error, Result};
use core::fmt;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Linkage method for hierarchical clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Linkage {
    /// Single linkage: minimum distance between clusters.
    Single,
    /// Complete linkage: maximum distance between clusters.
    Complete,
    /// Average linkage: mean distance between clusters.
    #[default]
    Average,
}

impl Linkage {
    /// Map the numeric option (0 single, 1 complete, 2 average).
    pub fn from_option(option: u8) -> Result<Self> {
        match option {
            0 => Ok(Linkage::Single),
            1 => Ok(Linkage::Complete),
            2 => Ok(Linkage::Average),
            _ => Err(Error::invalid_parameter(
                "linkage",
                format!("option {option} is outside 0-2"),
            )),
        }
    }

    /// Numeric option for this linkage.
    pub fn option(self) -> u8 {
        match self {
            Linkage::Single => 0,
            Linkage::Complete => 1,
            Linkage::Average => 2,
        }
    }

    /// Lower-case name.
    pub fn name(self) -> &'static str {
        match self {
            Linkage::Single => "single",
            Linkage::Complete => "complete",
            Linkage::Average => "average",
        }
    }

    /// Distance between the clusters with members `first` and `second`.
    ///
    /// Both lists must be non-empty; an empty list means the engine lost
    /// track of a cluster and is reported as an invariant error.
    pub fn evaluate<M: Dissimilarity>(
        self,
        first: &[usize],
        second: &[usize],
        ctx: &ClusteringContext<M>,
    ) -> Result<f32> {
        if first.is_empty() || second.is_empty() {
            return Err(Error::Invariant(format!(
                "linkage over empty member list ({} x {})",
                first.len(),
                second.len()
            )));
        }

        match self {
            Linkage::Single => {
                cross_reduce(first, second, ctx, f32::INFINITY, |d| d, f32::min)
            }
            Linkage::Complete => {
                cross_reduce(first, second, ctx, f32::NEG_INFINITY, |d| d, f32::max)
            }
            Linkage::Average => {
                let sum = cross_reduce(first, second, ctx, 0.0f64, f64::from, |a, b| a + b)?;
                Ok((sum / (first.len() * second.len()) as f64) as f32)
            }
        }
    }
}

impl TryFrom<u8> for Linkage {
    type Error = Error;

    fn try_from(option: u8) -> Result<Self> {
        Self::from_option(option)
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fold `combine(lift(d(a, b)))` over every `(a, b)` in `first × second`.
fn cross_reduce<M, T, L, C>(
    first: &[usize],
    second: &[usize],
    ctx: &ClusteringContext<M>,
    identity: T,
    lift: L,
    combine: C,
) -> Result<T>
where
    M: Dissimilarity,
    T: Copy + Send + Sync,
    L: Fn(f32) -> T + Sync + Send,
    C: Fn(T, T) -> T + Sync + Send,
{
    let row = |a: usize| -> Result<T> {
        second.iter().try_fold(identity, |acc, &b| {
            Ok(combine(acc, lift(ctx.pair(a, b)?)))
        })
    };

    #[cfg(feature = "parallel")]
    let reduced = first
        .par_iter()
        .map(|&a| row(a))
        .try_reduce(|| identity, |x, y| Ok(combine(x, y)));

    #[cfg(not(feature = "parallel"))]
    let reduced = first
        .iter()
        .try_fold(identity, |acc, &a| Ok(combine(acc, row(a)?)));

    reduced
}
