//! Pairwise dissimilarity between feature vectors.
//!
//! The merge engine never looks at raw features; it only asks for a scalar
//! distance between two point indices. That contract is [`Dissimilarity`]:
//!
//! - `d(a, b) >= 0`
//! - `d(a, b) == d(b, a)`
//! - `d(a, a) == 0`
//!
//! Which metric is used is selected by a [`NormOption`]. The numbering follows
//! the streamline-clustering convention (0–13). [`FeatureMetric`] implements
//! the variants that need nothing beyond the feature matrix itself; the rest
//! are expected from callers that own the required per-dataset preparation.
//!
//! A [`DistanceMatrix`] caches all `N×N` values once so that linkage
//! evaluation becomes a table lookup.

mod matrix;
mod metric;

pub use matrix::DistanceMatrix;
pub use metric::FeatureMetric;

use crate::error::{Error, Result};
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A symmetric, non-negative dissimilarity over `n_items` indexed points.
///
/// Implementations are shared across worker threads during linkage
/// evaluation, hence the `Sync` bound.
pub trait Dissimilarity: Sync {
    /// Number of points this service can address.
    fn n_items(&self) -> usize;

    /// Dissimilarity between points `a` and `b`.
    fn dissimilarity(&self, a: usize, b: usize) -> f32;

    /// Dissimilarity between an arbitrary vector (e.g. a centroid) and point `index`.
    fn distance_to(&self, query: &[f32], index: usize) -> f32;
}

impl<D: Dissimilarity + ?Sized> Dissimilarity for &D {
    fn n_items(&self) -> usize {
        (**self).n_items()
    }

    fn dissimilarity(&self, a: usize, b: usize) -> f32 {
        (**self).dissimilarity(a, b)
    }

    fn distance_to(&self, query: &[f32], index: usize) -> f32 {
        (**self).distance_to(query, index)
    }
}

/// Metric variant selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NormOption {
    /// 0: Euclidean norm.
    #[default]
    Euclidean,
    /// 1: Fractional distance metric.
    Fractional,
    /// 2: Piece-wise angle average.
    PiecewiseAngle,
    /// 3: Bhattacharyya metric for rotation.
    BhattacharyyaRotation,
    /// 4: Average rotation.
    AverageRotation,
    /// 5: Signed-angle intersection.
    SignedAngleIntersection,
    /// 6: Normal-direction multivariate distribution.
    NormalDirection,
    /// 7: Bhattacharyya metric with angle to a fixed direction.
    BhattacharyyaFixedDirection,
    /// 8: Piece-wise angle average times standard deviation.
    PiecewiseAngleStd,
    /// 9: Normal-direction multivariate un-normalized distribution.
    NormalDirectionUnnormalized,
    /// 10: Segment-wise `x·y / |x||y|`.
    SegmentCosine,
    /// 11: Cosine similarity.
    Cosine,
    /// 12: Mean of closest point distance.
    MeanClosestPoint,
    /// 13: Hausdorff distance.
    Hausdorff,
}

impl NormOption {
    /// All variants in option order.
    pub const ALL: [NormOption; 14] = [
        NormOption::Euclidean,
        NormOption::Fractional,
        NormOption::PiecewiseAngle,
        NormOption::BhattacharyyaRotation,
        NormOption::AverageRotation,
        NormOption::SignedAngleIntersection,
        NormOption::NormalDirection,
        NormOption::BhattacharyyaFixedDirection,
        NormOption::PiecewiseAngleStd,
        NormOption::NormalDirectionUnnormalized,
        NormOption::SegmentCosine,
        NormOption::Cosine,
        NormOption::MeanClosestPoint,
        NormOption::Hausdorff,
    ];

    /// Map the numeric option (0–13) to a variant.
    pub fn from_option(option: u8) -> Result<Self> {
        Self::ALL.get(option as usize).copied().ok_or_else(|| {
            Error::invalid_parameter("norm", format!("option {option} is outside 0-13"))
        })
    }

    /// Numeric option for this variant.
    pub fn option(self) -> u8 {
        self as u8
    }

    /// Short human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            NormOption::Euclidean => "euclidean",
            NormOption::Fractional => "fractional",
            NormOption::PiecewiseAngle => "piecewise-angle",
            NormOption::BhattacharyyaRotation => "bhattacharyya-rotation",
            NormOption::AverageRotation => "average-rotation",
            NormOption::SignedAngleIntersection => "signed-angle-intersection",
            NormOption::NormalDirection => "normal-direction",
            NormOption::BhattacharyyaFixedDirection => "bhattacharyya-fixed-direction",
            NormOption::PiecewiseAngleStd => "piecewise-angle-std",
            NormOption::NormalDirectionUnnormalized => "normal-direction-unnormalized",
            NormOption::SegmentCosine => "segment-cosine",
            NormOption::Cosine => "cosine",
            NormOption::MeanClosestPoint => "mean-closest-point",
            NormOption::Hausdorff => "hausdorff",
        }
    }
}

impl TryFrom<u8> for NormOption {
    type Error = Error;

    fn try_from(option: u8) -> Result<Self> {
        Self::from_option(option)
    }
}

impl fmt::Display for NormOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.option(), self.name())
    }
}
