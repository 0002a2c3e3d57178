//! Error types for gati-detect.

use thiserror::Error;

/// Configuration errors. These are fatal at construction time: the
/// detector refuses to start rather than run with undefined semantics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("neighbor_connectivity must be 6, 18, or 26 (got {0})")]
    InvalidConnectivity(u8),

    #[error("counter_to_reset must be at least 1")]
    InvalidCounterToReset,

    #[error("burn_in_period must be at least 1")]
    InvalidBurnInPeriod,

    #[error("tsdf_occupancy_threshold must be positive (got {0})")]
    InvalidOccupancyThreshold(f32),

    #[error("num_threads must be at least 1")]
    InvalidNumThreads,

    #[error("min_cluster_extent may not be negative (got {0})")]
    InvalidClusterExtent(f32),

    #[error("worker pool construction failed: {0}")]
    ThreadPool(String),
}

/// Per-frame processing errors. A frame that fails is dropped as a whole:
/// its points keep their default classification and the detector remains
/// usable for the next frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame counter must increase monotonically (got {got}, last processed {last})")]
    NonMonotonicFrame { got: u64, last: u64 },

    #[error("voxel layer geometry changed: expected {expected} voxels per side, got {got}")]
    LayerMismatch { expected: usize, got: usize },

    #[error("worker task failed: {0}")]
    Worker(String),
}
