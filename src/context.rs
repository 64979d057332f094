//! Per-run clustering context.
//!
//! Owns everything a run shares across components: the dissimilarity
//! service, the optional precomputed distance table and a diagnostics sink.
//! One context is created per run and passed by reference into the engine
//! and finalizer.

use crate::dissimilarity::{Dissimilarity, DistanceMatrix};
use crate::error::{check_finite, Error, Result};
use core::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// A timed stage of a clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    /// What was done.
    pub label: String,
    /// How long it took.
    pub elapsed: Duration,
}

/// Ordered record of stage timings and summary notes for one run.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    activities: Vec<Activity>,
    notes: Vec<(String, String)>,
}

impl Diagnostics {
    /// Record a completed stage.
    pub fn record(&mut self, label: impl Into<String>, elapsed: Duration) {
        let label = label.into();
        info!(stage = %label, elapsed_s = elapsed.as_secs_f64(), "stage finished");
        self.activities.push(Activity { label, elapsed });
    }

    /// Attach a labelled value (cluster count, entropy ratio, ...).
    pub fn note(&mut self, label: impl Into<String>, value: impl fmt::Display) {
        let label = label.into();
        let value = value.to_string();
        debug!(%label, %value, "note");
        self.notes.push((label, value));
    }

    /// Recorded stages, oldest first.
    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    /// Recorded notes, oldest first.
    pub fn notes(&self) -> &[(String, String)] {
        &self.notes
    }

    /// Look up the most recent note with `label`.
    pub fn note_value(&self, label: &str) -> Option<&str> {
        self.notes
            .iter()
            .rev()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }
}

/// Shared state for a single clustering run.
#[derive(Debug)]
pub struct ClusteringContext<M> {
    metric: M,
    cache: Option<DistanceMatrix>,
    diagnostics: Diagnostics,
}

impl<M: Dissimilarity> ClusteringContext<M> {
    /// Context that evaluates every pair through `metric`.
    pub fn new(metric: M) -> Self {
        Self {
            metric,
            cache: None,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Use an existing distance table instead of per-pair evaluation.
    pub fn with_cache(mut self, cache: DistanceMatrix) -> Result<Self> {
        if cache.n_items() != self.metric.n_items() {
            return Err(Error::DimensionMismatch {
                expected: self.metric.n_items(),
                found: cache.n_items(),
            });
        }
        self.cache = Some(cache);
        Ok(self)
    }

    /// Build the distance table from the metric. No-op if one is present.
    pub fn precompute(&mut self) -> Result<()> {
        if self.cache.is_some() {
            return Ok(());
        }
        let start = Instant::now();
        let cache = DistanceMatrix::build(&self.metric)?;
        self.cache = Some(cache);
        self.diagnostics
            .record("distance matrix computing", start.elapsed());
        Ok(())
    }

    /// Drop the distance table, handing it back to the caller.
    pub fn release_cache(&mut self) -> Option<DistanceMatrix> {
        self.cache.take()
    }

    /// The dissimilarity service.
    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// The distance table, if built or supplied.
    pub fn cache(&self) -> Option<&DistanceMatrix> {
        self.cache.as_ref()
    }

    /// Number of points.
    pub fn n_items(&self) -> usize {
        self.metric.n_items()
    }

    /// Diagnostics gathered so far.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Mutable diagnostics sink.
    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Distance between two points, from the cache when present.
    #[inline]
    pub fn pair(&self, a: usize, b: usize) -> Result<f32> {
        let d = match &self.cache {
            Some(cache) => cache.get(a, b),
            None => self.metric.dissimilarity(a, b),
        };
        check_finite(d, || format!("pair ({a}, {b})"))
    }

    /// Distance between a free vector and point `index`.
    #[inline]
    pub fn to_point(&self, query: &[f32], index: usize) -> Result<f32> {
        check_finite(self.metric.distance_to(query, index), || {
            format!("point {index} vs query vector")
        })
    }
}
