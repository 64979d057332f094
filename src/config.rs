//! Run configuration.

use crate::cluster::Linkage;
use crate::dissimilarity::NormOption;
use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters of one agglomerative run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AhcConfig {
    /// Target number of clusters `k`, `1 <= k < n`.
    pub n_clusters: usize,
    /// Linkage rule.
    pub linkage: Linkage,
    /// Metric used when the crate builds the dissimilarity itself.
    pub norm: NormOption,
    /// Build the full distance matrix before merging.
    pub precompute: bool,
}

impl AhcConfig {
    /// Average linkage, Euclidean norm, precomputed distances.
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            linkage: Linkage::default(),
            norm: NormOption::default(),
            precompute: true,
        }
    }

    /// Build from the numeric norm (0–13) and linkage (0–2) options.
    pub fn from_options(norm_option: u8, linkage_option: u8, n_clusters: usize) -> Result<Self> {
        Ok(Self {
            n_clusters,
            linkage: Linkage::from_option(linkage_option)?,
            norm: NormOption::from_option(norm_option)?,
            precompute: true,
        })
    }

    /// Set the linkage rule.
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Set the norm.
    pub fn with_norm(mut self, norm: NormOption) -> Self {
        self.norm = norm;
        self
    }

    /// Enable or disable the precomputed distance matrix.
    pub fn with_precompute(mut self, precompute: bool) -> Self {
        self.precompute = precompute;
        self
    }

    /// Check the target against the number of points.
    pub fn validate(&self, n_items: usize) -> Result<()> {
        check_cluster_count(n_items, self.n_clusters)
    }
}

/// `n >= 2` and `1 <= k < n`; shared by [`AhcConfig::validate`] and the merge engine.
pub(crate) fn check_cluster_count(n_items: usize, n_clusters: usize) -> Result<()> {
    if n_items < 2 {
        return Err(Error::invalid_parameter(
            "n_items",
            format!("need at least 2 items to cluster, got {n_items}"),
        ));
    }
    if n_clusters == 0 || n_clusters >= n_items {
        return Err(Error::InvalidClusterCount {
            requested: n_clusters,
            n_items,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_from_options() {
        let cfg = AhcConfig::from_options(13, 1, 4).unwrap();
        assert_eq!(cfg.norm, NormOption::Hausdorff);
        assert_eq!(cfg.linkage, Linkage::Complete);
        assert!(cfg.precompute);

        assert!(AhcConfig::from_options(14, 0, 2).is_err());
        assert!(AhcConfig::from_options(0, 3, 2).is_err());
    }

    #[test]
    fn test_validate_bounds() {
        let cfg = AhcConfig::new(3);
        assert!(cfg.validate(4).is_ok());
        assert_eq!(cfg.validate(3).unwrap_err().kind(), ErrorKind::Configuration);
        assert!(AhcConfig::new(0).validate(4).is_err());
        assert!(AhcConfig::new(1).validate(1).is_err());
        assert!(AhcConfig::new(1).validate(2).is_ok());
    }

    #[test]
    fn test_builder() {
        let cfg = AhcConfig::new(2)
            .with_linkage(Linkage::Single)
            .with_norm(NormOption::Cosine)
            .with_precompute(false);
        assert_eq!(cfg.linkage, Linkage::Single);
        assert_eq!(cfg.norm, NormOption::Cosine);
        assert!(!cfg.precompute);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let cfg = AhcConfig::new(5).with_linkage(Linkage::Complete);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: AhcConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
