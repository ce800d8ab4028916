//! Configuration management for nnstore

use serde::{Deserialize, Serialize};

/// The fixed vantage-point selection seed. Builds must be reproducible
/// across runs over the same input, so this is a constant rather than a
/// config field.
pub const VP_TREE_SEED: u64 = 23;

/// Main configuration structure for the nnstore engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Row-sampling PRNG configuration.
    pub sampling: SamplingConfig,

    /// VP-tree search limits.
    pub vp_tree: VpTreeConfig,

    /// Density engine defaults.
    pub density: DensityConfig,

    /// Generative-data ingestion limits.
    pub generative_data: GenerativeDataConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sampling: SamplingConfig::default(),
            vp_tree: VpTreeConfig::default(),
            density: DensityConfig::default(),
            generative_data: GenerativeDataConfig::default(),
        }
    }
}

/// Configuration for the three independent PRNG streams named in the
/// design notes: row sampling, NOMINAL one-hot substitution, and VP-tree
/// vantage selection. The VP-tree stream is always seeded with
/// [`VP_TREE_SEED`] (not configurable); this struct covers the other two,
/// which default to a process entropy source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Seed for row-sampling draws (`get_data_random` and friends).
    /// `None` draws from process entropy; `Some(seed)` makes sampling
    /// reproducible, which test code relies on.
    pub seed: Option<u64>,

    /// Seed for NOMINAL one-hot substitution of unknown (id = 0) values.
    /// `None` draws from process entropy.
    pub nominal_seed: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            seed: None,
            nominal_seed: None,
        }
    }
}

/// VP-tree build and search limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpTreeConfig {
    /// Hard cap on the candidate heap during search (`MAX_NN` in the
    /// search algorithm). Candidates beyond this are evicted even if
    /// fewer than `k` distinct distances have been seen.
    pub max_nearest_neighbors: usize,
}

impl Default for VpTreeConfig {
    fn default() -> Self {
        Self {
            max_nearest_neighbors: 128,
        }
    }
}

/// Density engine defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityConfig {
    /// Default `k` for `calculate_density_values` when a caller does not
    /// supply one explicitly.
    pub default_k: usize,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self { default_k: 20 }
    }
}

/// Guards on generative-data ingestion, supplementing the spec with the
/// `cMaxSizeExceeded` ceiling `gdInt.cpp::gdGenerativeDataRead` enforces
/// against the *stored* row count. There is no per-call batch cap in the
/// original — `gdAddValueRows` accepts whatever the host sends in one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerativeDataConfig {
    /// Upper bound on a generative data's normalised row count.
    pub max_rows: usize,
}

impl Default for GenerativeDataConfig {
    fn default() -> Self {
        Self {
            max_rows: 256 * 25_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_stable() {
        let cfg = Config::default();
        assert_eq!(cfg.vp_tree.max_nearest_neighbors, 128);
        assert_eq!(cfg.density.default_k, 20);
        assert_eq!(cfg.generative_data.max_rows, 256 * 25_000);
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = Config::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.density.default_k, cfg.density.default_k);
    }
}
