//! Per-voxel motion annotation record.
//!
//! Fields mutated only while the layer is held mutably (occupancy
//! accounting, revocation, labeling) are plain values. Fields touched
//! from inside a fork-join phase, where workers share the layer, are
//! atomic; the phase barriers provide the cross-phase ordering, so
//! relaxed loads and stores suffice everywhere except the clustering
//! claim token, which must be an acquire-release check-and-set.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Motion state of one voxel, stored parallel to the TSDF voxel with the
/// same key. Owned and written exclusively by this crate.
#[derive(Debug, Default)]
pub struct MotionVoxel {
    /// Consecutive (buffer-tolerant) occupied observations.
    pub occ_counter: u32,
    /// Frame of the most recent occupancy evidence, distance- or
    /// point-based. Zero means never occupied.
    pub last_occupied: u64,
    /// Frame of the most recent lidar point hit. Comparing against the
    /// current frame doubles as the "occupied this frame" marker.
    pub last_point_occupied: AtomicU64,
    /// The voxel is trusted as permanent free space.
    pub ever_free: AtomicBool,
    /// The voxel currently belongs to a believed-moving object.
    pub dynamic: bool,
    /// Claim token for the clustering pass: a voxel is claimed by exactly
    /// one expansion per frame.
    pub clustering_processed: AtomicBool,
}

/// Plain-value snapshot of a voxel's motion state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MotionVoxelState {
    /// Consecutive occupied observations.
    pub occ_counter: u32,
    /// Frame of the most recent occupancy evidence.
    pub last_occupied: u64,
    /// Frame of the most recent lidar point hit.
    pub last_point_occupied: u64,
    /// Trusted free space.
    pub ever_free: bool,
    /// Believed moving.
    pub dynamic: bool,
}

impl MotionVoxel {
    /// Whether a lidar point hit this voxel in the given frame.
    #[inline]
    pub fn point_occupied_at(&self, frame: u64) -> bool {
        self.last_point_occupied.load(Ordering::Relaxed) == frame
    }

    /// Whether the voxel is currently trusted as free space.
    #[inline]
    pub fn is_ever_free(&self) -> bool {
        self.ever_free.load(Ordering::Relaxed)
    }

    /// Claim this voxel for a cluster expansion. Returns true exactly
    /// once per frame across all expansions.
    #[inline]
    pub fn claim_for_clustering(&self) -> bool {
        self.clustering_processed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Snapshot the voxel state.
    pub fn state(&self) -> MotionVoxelState {
        MotionVoxelState {
            occ_counter: self.occ_counter,
            last_occupied: self.last_occupied,
            last_point_occupied: self.last_point_occupied.load(Ordering::Relaxed),
            ever_free: self.ever_free.load(Ordering::Relaxed),
            dynamic: self.dynamic,
        }
    }
}
