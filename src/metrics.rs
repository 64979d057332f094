//! Summary statistics of a final partition.
//!
//! | Metric | Range | Meaning |
//! |--------|-------|---------|
//! | [`shannon_entropy`] | [0, log2 k] | Bits of uncertainty in the cluster-size distribution |
//! | [`entropy_ratio`] | [0, 1] | Entropy normalised by `log2 k`; 1 = equal sizes |
//!
//! A low entropy ratio means a few clusters hold most points (distinguishable,
//! imbalanced); a ratio of 1 means all clusters are the same size.

/// Shannon entropy (base 2) of the distribution `counts / sum(counts)`.
///
/// Zero counts contribute nothing.
pub fn shannon_entropy(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Normalised entropy of cluster sizes: `H(sizes / n) / log2(k)`.
///
/// With a single cluster the normaliser `log2(1)` is zero; the ratio is
/// defined as `0.0` in that case. Equal-sized clusters give exactly `1.0`.
///
/// ```rust
/// use agglo::metrics::entropy_ratio;
///
/// assert_eq!(entropy_ratio(&[2, 2]), 1.0);
/// assert_eq!(entropy_ratio(&[5]), 0.0);
/// assert!(entropy_ratio(&[99, 1]) < 0.1);
/// ```
pub fn entropy_ratio(sizes: &[usize]) -> f64 {
    let k = sizes.iter().filter(|&&s| s > 0).count();
    if k <= 1 {
        return 0.0;
    }
    if sizes.iter().all(|&s| s == sizes[0]) {
        return 1.0;
    }
    (shannon_entropy(sizes) / (k as f64).log2()).clamp(0.0, 1.0)
}
