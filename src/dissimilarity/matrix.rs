//! Precomputed N×N distance table.
//!
//! Built once before merging starts, read-only afterwards and shared by all
//! worker threads without locking. Persisted as whitespace-separated rows,
//! one file per norm option.

use super::{Dissimilarity, NormOption};
use crate::error::{check_finite, Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Tolerance used when validating symmetry and the zero diagonal of a loaded table.
const SYMMETRY_TOL: f32 = 1e-5;

/// Dense symmetric distance matrix with a zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n_items: usize,
    /// Row-major, `n_items * n_items`.
    values: Vec<f32>,
}

impl DistanceMatrix {
    /// Evaluate every pair through `metric`.
    ///
    /// Only the upper triangle is computed; the lower one is mirrored so the
    /// result is exactly symmetric.
    pub fn build<D: Dissimilarity + ?Sized>(metric: &D) -> Result<Self> {
        let n = metric.n_items();
        if n == 0 {
            return Err(Error::EmptyInput);
        }

        let upper_row = |i: usize| -> Result<Vec<f32>> {
            ((i + 1)..n)
                .map(|j| {
                    check_finite(metric.dissimilarity(i, j), || format!("pair ({i}, {j})"))
                })
                .collect()
        };

        #[cfg(feature = "parallel")]
        let rows: Vec<Vec<f32>> = (0..n)
            .into_par_iter()
            .map(upper_row)
            .collect::<Result<_>>()?;
        #[cfg(not(feature = "parallel"))]
        let rows: Vec<Vec<f32>> = (0..n).map(upper_row).collect::<Result<_>>()?;

        let mut values = vec![0.0f32; n * n];
        for (i, row) in rows.iter().enumerate() {
            for (offset, &d) in row.iter().enumerate() {
                let j = i + 1 + offset;
                values[i * n + j] = d;
                values[j * n + i] = d;
            }
        }

        Ok(Self { n_items: n, values })
    }

    /// Wrap an existing row-major table after validating it.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let n = rows.len();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        let mut values = Vec::with_capacity(n * n);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n {
                return Err(Error::MalformedMatrix(format!(
                    "row {i} has {} columns, expected {n}",
                    row.len()
                )));
            }
            values.extend(row);
        }
        let matrix = Self { n_items: n, values };
        matrix.validate()?;
        Ok(matrix)
    }

    fn validate(&self) -> Result<()> {
        let n = self.n_items;
        for i in 0..n {
            let diag = self.values[i * n + i];
            if !diag.is_finite() || diag.abs() > SYMMETRY_TOL {
                return Err(Error::MalformedMatrix(format!(
                    "diagonal entry {i} is {diag}"
                )));
            }
            for j in (i + 1)..n {
                let (a, b) = (self.values[i * n + j], self.values[j * n + i]);
                if !a.is_finite() || !b.is_finite() || a < 0.0 || b < 0.0 {
                    return Err(Error::MalformedMatrix(format!(
                        "entry ({i}, {j}) is not a finite non-negative distance"
                    )));
                }
                if (a - b).abs() > SYMMETRY_TOL * a.abs().max(1.0) {
                    return Err(Error::MalformedMatrix(format!(
                        "asymmetric at ({i}, {j}): {a} vs {b}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Number of points covered.
    pub fn n_items(&self) -> usize {
        self.n_items
    }

    /// Cached distance between `a` and `b`.
    #[inline]
    pub fn get(&self, a: usize, b: usize) -> f32 {
        self.values[a * self.n_items + b]
    }

    /// Conventional file name for a given norm.
    pub fn file_name(norm: NormOption) -> String {
        format!("distance_matrix_norm{}.txt", norm.option())
    }

    /// Path of the cache file for `norm` inside `dir`.
    pub fn path_for(dir: impl AsRef<Path>, norm: NormOption) -> PathBuf {
        dir.as_ref().join(Self::file_name(norm))
    }

    /// Parse whitespace-separated rows.
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self> {
        let mut rows = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let row = line
                .split_whitespace()
                .map(|tok| {
                    tok.parse::<f32>().map_err(|e| {
                        Error::MalformedMatrix(format!("line {}: '{tok}': {e}", lineno + 1))
                    })
                })
                .collect::<Result<Vec<f32>>>()?;
            rows.push(row);
        }
        Self::from_rows(rows)
    }

    /// Write one row per line, values separated by single spaces.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        for row in self.values.chunks(self.n_items) {
            let mut first = true;
            for v in row {
                if !first {
                    writer.write_all(b" ")?;
                }
                write!(writer, "{v}")?;
                first = false;
            }
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Load the cache for `norm` from `dir`.
    pub fn load(dir: impl AsRef<Path>, norm: NormOption) -> Result<Self> {
        let file = File::open(Self::path_for(dir, norm))?;
        Self::read_from(BufReader::new(file))
    }

    /// Persist the cache for `norm` into `dir`, returning the written path.
    pub fn save(&self, dir: impl AsRef<Path>, norm: NormOption) -> Result<PathBuf> {
        let path = Self::path_for(dir, norm);
        let file = File::create(&path)?;
        self.write_to(BufWriter::new(file))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dissimilarity::FeatureMetric;
    use crate::error::ErrorKind;

    fn metric() -> FeatureMetric {
        let data = vec![vec![0.0, 0.0], vec![3.0, 4.0], vec![6.0, 8.0]];
        FeatureMetric::new(&data, NormOption::Euclidean).unwrap()
    }

    #[test]
    fn test_build_matches_metric() {
        let m = metric();
        let cache = DistanceMatrix::build(&m).unwrap();
        assert_eq!(cache.n_items(), 3);
        for i in 0..3 {
            assert_eq!(cache.get(i, i), 0.0);
            for j in 0..3 {
                assert_eq!(cache.get(i, j), cache.get(j, i));
                assert_eq!(cache.get(i, j), m.dissimilarity(i, j));
            }
        }
        assert_eq!(cache.get(0, 2), 10.0);
    }

    #[test]
    fn test_text_persistence() {
        let cache = DistanceMatrix::build(&metric()).unwrap();
        let mut buf = Vec::new();
        cache.write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert_eq!(text.lines().next().unwrap(), "0 5 10");
        let parsed = DistanceMatrix::read_from(buf.as_slice()).unwrap();
        assert_eq!(parsed, cache);
    }

    #[test]
    fn test_save_and_load_by_norm() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DistanceMatrix::build(&metric()).unwrap();
        let path = cache.save(dir.path(), NormOption::Euclidean).unwrap();
        assert!(path.ends_with("distance_matrix_norm0.txt"));
        let loaded = DistanceMatrix::load(dir.path(), NormOption::Euclidean).unwrap();
        assert_eq!(loaded, cache);

        let missing = DistanceMatrix::load(dir.path(), NormOption::Hausdorff).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_rejects_malformed_tables() {
        let ragged = "0 1\n1\n";
        assert!(matches!(
            DistanceMatrix::read_from(ragged.as_bytes()),
            Err(Error::MalformedMatrix(_))
        ));
        let asymmetric = "0 1\n2 0\n";
        assert!(DistanceMatrix::read_from(asymmetric.as_bytes()).is_err());
        let diagonal = "1 1\n1 0\n";
        assert!(DistanceMatrix::read_from(diagonal.as_bytes()).is_err());
        let garbage = "0 x\nx 0\n";
        assert!(DistanceMatrix::read_from(garbage.as_bytes()).is_err());
        let nan = "0 NaN\nNaN 0\n";
        assert!(DistanceMatrix::read_from(nan.as_bytes()).is_err());
    }

    #[test]
    fn test_build_surfaces_nan() {
        struct Broken;
        impl Dissimilarity for Broken {
            fn n_items(&self) -> usize {
                3
            }
            fn dissimilarity(&self, a: usize, b: usize) -> f32 {
                if a + b == 3 {
                    f32::NAN
                } else {
                    1.0
                }
            }
            fn distance_to(&self, _query: &[f32], _index: usize) -> f32 {
                0.0
            }
        }
        let err = DistanceMatrix::build(&Broken).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NumericAnomaly);
    }
}
