//! TSDF voxel record.

use serde::{Deserialize, Serialize};

/// Observation weight below which a voxel counts as never observed.
pub const WEIGHT_EPSILON: f32 = 1e-6;

/// A single TSDF voxel. Owned by the externally-managed mapping
/// subsystem; this crate only reads these fields.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TsdfVoxel {
    /// Signed distance to the nearest surface (meters). Negative or
    /// near-zero means the voxel is at or inside a surface.
    pub distance: f32,
    /// Observation confidence. Zero means never observed.
    pub weight: f32,
}

impl Default for TsdfVoxel {
    fn default() -> Self {
        Self {
            distance: f32::MAX,
            weight: 0.0,
        }
    }
}

impl TsdfVoxel {
    /// Whether the voxel has ever been observed.
    #[inline]
    pub fn is_observed(&self) -> bool {
        self.weight > WEIGHT_EPSILON
    }
}
