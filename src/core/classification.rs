//! Per-point classification output and per-frame result types.

use serde::{Deserialize, Serialize};

/// Classification of a single input point, index-aligned with the input
/// cloud. All flags start false and are only ever raised within the frame
/// that produced them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointClassification {
    /// The point should be treated as not-a-static-surface by downstream
    /// consumers (map integration).
    pub filtered_out: bool,
    /// The point belongs to a cluster that passed the cluster-level
    /// filters.
    pub cluster_level_dynamic: bool,
    /// The point fell into a voxel that was already trusted as free space.
    pub ever_free_level_dynamic: bool,
}

/// Timing breakdown for a single frame (all times in microseconds).
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingBreakdown {
    /// Time spent bucketing points into voxels (µs).
    pub indexing_us: u64,
    /// Time spent updating the ever-free state machine (µs).
    pub ever_free_us: u64,
    /// Time spent clustering and labeling (µs).
    pub clustering_us: u64,
    /// Total frame processing time (µs).
    pub total_us: u64,
}

/// Counters describing what a frame did.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    /// Blocks whose motion channel was marked updated this frame.
    pub blocks_updated: usize,
    /// Occupied ever-free voxels that seeded the clustering pass.
    pub seed_voxels: usize,
    /// Connected components discovered by the clustering pass.
    pub clusters_found: usize,
    /// Clusters surviving the cluster-level filters.
    pub clusters_kept: usize,
    /// Points labeled dynamic at the cluster level.
    pub dynamic_points: usize,
    /// Timing breakdown for this frame.
    pub timing: TimingBreakdown,
}

/// Result of processing one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameResult {
    /// One classification per input point, index-aligned.
    pub classifications: Vec<PointClassification>,
    /// Frame counters and timings.
    pub stats: FrameStats,
}

impl FrameResult {
    /// Number of points labeled dynamic at the cluster level.
    pub fn dynamic_count(&self) -> usize {
        self.classifications
            .iter()
            .filter(|c| c.cluster_level_dynamic)
            .count()
    }
}
