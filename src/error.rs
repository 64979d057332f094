use thiserror::Error;

/// Result alias for `agglo`.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of [`Error`] values.
///
/// None of these are retried: any error invalidates the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid inputs or options, reported before any work begins.
    Configuration,
    /// Internal consistency failure during clustering.
    Invariant,
    /// A dissimilarity came back NaN or infinite.
    NumericAnomaly,
    /// Reading or writing a cached distance matrix failed.
    Io,
}

/// Errors returned by the clustering pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Input was empty.
    #[error("empty input provided")]
    EmptyInput,

    /// Feature rows of differing length.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Target cluster count outside `[1, n_items)`.
    #[error("cannot create {requested} clusters from {n_items} items")]
    InvalidClusterCount {
        /// Requested count.
        requested: usize,
        /// Number of items.
        n_items: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: String,
    },

    /// An internal invariant of the merge engine did not hold.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// The dissimilarity service produced a non-finite value.
    #[error("non-finite dissimilarity {value} at {location}")]
    NumericAnomaly {
        /// Which pair (or member/centroid) produced it.
        location: String,
        /// The offending value.
        value: f32,
    },

    /// I/O error while persisting or loading a distance matrix.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted distance matrix failed validation.
    #[error("malformed distance matrix: {0}")]
    MalformedMatrix(String),
}

impl Error {
    /// Taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyInput
            | Error::DimensionMismatch { .. }
            | Error::InvalidClusterCount { .. }
            | Error::InvalidParameter { .. } => ErrorKind::Configuration,
            Error::Invariant(_) => ErrorKind::Invariant,
            Error::NumericAnomaly { .. } => ErrorKind::NumericAnomaly,
            Error::Io(_) | Error::MalformedMatrix(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}

/// Reject NaN/Inf before it reaches a min/max comparison.
#[inline]
pub(crate) fn check_finite(value: f32, location: impl FnOnce() -> String) -> Result<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::NumericAnomaly {
            location: location(),
            value,
        })
    }
}
