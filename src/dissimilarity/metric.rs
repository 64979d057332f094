//! Built-in dissimilarities computed directly from the feature matrix.

use super::{Dissimilarity, NormOption};
use crate::error::{Error, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Exponent of the fractional distance metric.
const FRACTIONAL_P: f32 = 0.5;

/// Dissimilarity over the rows of an `N × D` feature matrix.
///
/// Supports [`NormOption::Euclidean`], [`NormOption::Fractional`],
/// [`NormOption::Cosine`], [`NormOption::MeanClosestPoint`] and
/// [`NormOption::Hausdorff`]. The last two read each row as a polyline of
/// `point_dimension`-D vertices (3 by default).
#[derive(Debug, Clone)]
pub struct FeatureMetric {
    features: Array2<f32>,
    norm: NormOption,
    point_dimension: usize,
    /// Row L2 norms, only filled for cosine.
    row_norms: Array1<f32>,
}

impl FeatureMetric {
    /// Build from row vectors.
    pub fn new(data: &[Vec<f32>], norm: NormOption) -> Result<Self> {
        let first = data.first().ok_or(Error::EmptyInput)?;
        let d = first.len();
        let mut flat: Vec<f32> = Vec::with_capacity(data.len() * d);
        for point in data {
            if point.len() != d {
                return Err(Error::DimensionMismatch {
                    expected: d,
                    found: point.len(),
                });
            }
            flat.extend(point);
        }
        let features = Array2::from_shape_vec((data.len(), d), flat)
            .map_err(|e| Error::invalid_parameter("data", e.to_string()))?;
        Self::from_array(features, norm)
    }

    /// Build from an owned feature matrix.
    pub fn from_array(features: Array2<f32>, norm: NormOption) -> Result<Self> {
        if features.nrows() == 0 || features.ncols() == 0 {
            return Err(Error::EmptyInput);
        }
        if !Self::supports(norm) {
            return Err(Error::invalid_parameter(
                "norm",
                format!("{norm} needs an external dissimilarity service"),
            ));
        }

        let row_norms = if norm == NormOption::Cosine {
            features
                .axis_iter(Axis(0))
                .map(|row| row.dot(&row).sqrt())
                .collect()
        } else {
            Array1::zeros(0)
        };

        let mut metric = Self {
            features,
            norm,
            point_dimension: 1,
            row_norms,
        };
        if metric.is_polyline() {
            metric = metric.with_point_dimension(3)?;
        }
        Ok(metric)
    }

    /// Vertex dimension used by the polyline norms.
    pub fn with_point_dimension(mut self, point_dimension: usize) -> Result<Self> {
        if point_dimension == 0 || self.features.ncols() % point_dimension != 0 {
            return Err(Error::invalid_parameter(
                "point_dimension",
                format!(
                    "{point_dimension} does not divide feature length {}",
                    self.features.ncols()
                ),
            ));
        }
        self.point_dimension = point_dimension;
        Ok(self)
    }

    /// Whether this type can evaluate `norm` on its own.
    pub fn supports(norm: NormOption) -> bool {
        matches!(
            norm,
            NormOption::Euclidean
                | NormOption::Fractional
                | NormOption::Cosine
                | NormOption::MeanClosestPoint
                | NormOption::Hausdorff
        )
    }

    /// The underlying feature matrix.
    pub fn features(&self) -> &Array2<f32> {
        &self.features
    }

    /// Selected norm.
    pub fn norm(&self) -> NormOption {
        self.norm
    }

    fn is_polyline(&self) -> bool {
        matches!(
            self.norm,
            NormOption::MeanClosestPoint | NormOption::Hausdorff
        )
    }

    fn eval(&self, a: ArrayView1<'_, f32>, a_norm: f32, b: ArrayView1<'_, f32>, b_norm: f32) -> f32 {
        match self.norm {
            NormOption::Euclidean => euclidean(a, b),
            NormOption::Fractional => fractional(a, b),
            NormOption::Cosine => cosine_distance(a, a_norm, b, b_norm),
            NormOption::MeanClosestPoint => {
                let ab = directed_closest(a, b, self.point_dimension);
                let ba = directed_closest(b, a, self.point_dimension);
                (ab.mean + ba.mean) / 2.0
            }
            NormOption::Hausdorff => {
                let ab = directed_closest(a, b, self.point_dimension);
                let ba = directed_closest(b, a, self.point_dimension);
                ab.max.max(ba.max)
            }
            // `from_array` rejects everything else.
            _ => f32::NAN,
        }
    }

    fn row_norm(&self, index: usize) -> f32 {
        self.row_norms.get(index).copied().unwrap_or(0.0)
    }
}

impl Dissimilarity for FeatureMetric {
    fn n_items(&self) -> usize {
        self.features.nrows()
    }

    fn dissimilarity(&self, a: usize, b: usize) -> f32 {
        if a == b {
            return 0.0;
        }
        self.eval(
            self.features.row(a),
            self.row_norm(a),
            self.features.row(b),
            self.row_norm(b),
        )
    }

    fn distance_to(&self, query: &[f32], index: usize) -> f32 {
        let q = ArrayView1::from(query);
        let q_norm = if self.norm == NormOption::Cosine {
            q.dot(&q).sqrt()
        } else {
            0.0
        };
        self.eval(q, q_norm, self.features.row(index), self.row_norm(index))
    }
}

#[inline]
fn euclidean(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[inline]
fn fractional(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs().powf(FRACTIONAL_P))
        .sum::<f32>()
        .powf(1.0 / FRACTIONAL_P)
}

#[inline]
fn cosine_distance(a: ArrayView1<'_, f32>, a_norm: f32, b: ArrayView1<'_, f32>, b_norm: f32) -> f32 {
    match (a_norm == 0.0, b_norm == 0.0) {
        (true, true) => return 0.0,
        (true, false) | (false, true) => return 1.0,
        (false, false) => {}
    }
    (1.0 - a.dot(&b) / (a_norm * b_norm)).max(0.0)
}

struct Directed {
    mean: f32,
    max: f32,
}

/// For every vertex of `a`, the distance to the nearest vertex of `b`.
fn directed_closest(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>, dim: usize) -> Directed {
    let mut sum = 0.0f32;
    let mut max = 0.0f32;
    let mut count = 0usize;
    for va in a.exact_chunks(dim) {
        let nearest = b
            .exact_chunks(dim)
            .into_iter()
            .map(|vb| euclidean(va.view(), vb))
            .fold(f32::INFINITY, f32::min);
        sum += nearest;
        max = max.max(nearest);
        count += 1;
    }
    Directed {
        mean: if count == 0 { 0.0 } else { sum / count as f32 },
        max,
    }
}
