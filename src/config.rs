//! Detector configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for [`MotionDetector`](crate::MotionDetector).
///
/// Invalid values are rejected at construction; the detector never runs
/// with undefined semantics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MotionDetectorConfig {
    /// Adjacency definition used for every neighborhood query.
    /// Must be 6, 18, or 26.
    #[serde(default = "default_neighbor_connectivity")]
    pub neighbor_connectivity: u8,

    /// Occupied observations (buffer-tolerant, consecutive) after which a
    /// voxel's ever-free status is revoked. Must be at least 1.
    #[serde(default = "default_counter_to_reset")]
    pub counter_to_reset: u32,

    /// Grace frames tolerated between occupancy hits before the
    /// occupancy counter resets.
    #[serde(default = "default_temporal_buffer")]
    pub temporal_buffer: u32,

    /// Quiescent frames required before a voxel may be granted ever-free
    /// status. Must be at least 1.
    #[serde(default = "default_burn_in_period")]
    pub burn_in_period: u32,

    /// TSDF distance (meters) below which a voxel counts as occupied.
    /// Must be positive.
    #[serde(default = "default_tsdf_occupancy_threshold")]
    pub tsdf_occupancy_threshold: f32,

    /// Worker pool size for the per-frame fork-join phases. Must be at
    /// least 1; defaults to the available hardware concurrency.
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,

    /// Minimum points for a cluster to survive the cluster-level filters.
    #[serde(default = "default_min_cluster_points")]
    pub min_cluster_points: usize,

    /// Minimum spatial extent (meters, bounding-box diagonal) for a
    /// cluster to survive the cluster-level filters.
    #[serde(default = "default_min_cluster_extent")]
    pub min_cluster_extent: f32,
}

fn default_neighbor_connectivity() -> u8 {
    18
}

fn default_counter_to_reset() -> u32 {
    50
}

fn default_temporal_buffer() -> u32 {
    2
}

fn default_burn_in_period() -> u32 {
    5
}

fn default_tsdf_occupancy_threshold() -> f32 {
    0.3
}

fn default_num_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_min_cluster_points() -> usize {
    25
}

fn default_min_cluster_extent() -> f32 {
    0.25
}

impl Default for MotionDetectorConfig {
    fn default() -> Self {
        Self {
            neighbor_connectivity: default_neighbor_connectivity(),
            counter_to_reset: default_counter_to_reset(),
            temporal_buffer: default_temporal_buffer(),
            burn_in_period: default_burn_in_period(),
            tsdf_occupancy_threshold: default_tsdf_occupancy_threshold(),
            num_threads: default_num_threads(),
            min_cluster_points: default_min_cluster_points(),
            min_cluster_extent: default_min_cluster_extent(),
        }
    }
}

impl MotionDetectorConfig {
    /// Check every constraint, reporting the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.neighbor_connectivity, 6 | 18 | 26) {
            return Err(ConfigError::InvalidConnectivity(self.neighbor_connectivity));
        }
        if self.counter_to_reset < 1 {
            return Err(ConfigError::InvalidCounterToReset);
        }
        if self.burn_in_period < 1 {
            return Err(ConfigError::InvalidBurnInPeriod);
        }
        if self.tsdf_occupancy_threshold <= 0.0 {
            return Err(ConfigError::InvalidOccupancyThreshold(
                self.tsdf_occupancy_threshold,
            ));
        }
        if self.num_threads < 1 {
            return Err(ConfigError::InvalidNumThreads);
        }
        if self.min_cluster_extent < 0.0 {
            return Err(ConfigError::InvalidClusterExtent(self.min_cluster_extent));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(MotionDetectorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = MotionDetectorConfig::default();
        config.neighbor_connectivity = 8;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidConnectivity(8))
        );

        let mut config = MotionDetectorConfig::default();
        config.counter_to_reset = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidCounterToReset));

        let mut config = MotionDetectorConfig::default();
        config.burn_in_period = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidBurnInPeriod));

        let mut config = MotionDetectorConfig::default();
        config.tsdf_occupancy_threshold = 0.0;
        assert!(config.validate().is_err());

        let mut config = MotionDetectorConfig::default();
        config.num_threads = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidNumThreads));
    }

    #[test]
    fn test_temporal_buffer_zero_is_valid() {
        let mut config = MotionDetectorConfig::default();
        config.temporal_buffer = 0;
        assert!(config.validate().is_ok());
    }
}
