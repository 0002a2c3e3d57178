//! Voxel adjacency under 6-, 18-, or 26-connectivity.
//!
//! Neighbor addresses may land in a different block; local indices are
//! re-normalized across block boundaries using the layer's fixed
//! voxels-per-side count.

use crate::core::{BlockIndex, VoxelIndex, VoxelKey};
use crate::error::ConfigError;

/// Precomputed neighbor offset table for one connectivity class.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborhoodSearch {
    offsets: Vec<[i32; 3]>,
}

impl NeighborhoodSearch {
    /// Build the offset table. Connectivity must be 6 (faces), 18 (faces
    /// and edges) or 26 (faces, edges and vertices).
    pub fn new(connectivity: u8) -> Result<Self, ConfigError> {
        let max_manhattan = match connectivity {
            6 => 1,
            18 => 2,
            26 => 3,
            other => return Err(ConfigError::InvalidConnectivity(other)),
        };

        let mut offsets = Vec::with_capacity(connectivity as usize);
        for dz in -1i32..=1 {
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let manhattan = dx.abs() + dy.abs() + dz.abs();
                    if manhattan > 0 && manhattan <= max_manhattan {
                        offsets.push([dx, dy, dz]);
                    }
                }
            }
        }
        debug_assert_eq!(offsets.len(), connectivity as usize);

        Ok(Self { offsets })
    }

    /// Number of neighbors per voxel.
    #[inline]
    pub fn connectivity(&self) -> usize {
        self.offsets.len()
    }

    /// All neighbor keys of a voxel, crossing block boundaries as needed.
    /// Deterministic per call; no guarantee about ordering across calls.
    pub fn neighbors(&self, key: VoxelKey, voxels_per_side: usize) -> Vec<VoxelKey> {
        let vps = voxels_per_side as i32;
        self.offsets
            .iter()
            .map(|offset| {
                let mut block = key.block;
                let mut voxel = key.voxel;
                shift_axis(&mut block.x, &mut voxel.x, offset[0], vps);
                shift_axis(&mut block.y, &mut voxel.y, offset[1], vps);
                shift_axis(&mut block.z, &mut voxel.z, offset[2], vps);
                VoxelKey::new(block, voxel)
            })
            .collect()
    }
}

/// Apply a single-step offset along one axis, wrapping into the adjacent
/// block when the local index leaves `[0, vps)`.
#[inline]
fn shift_axis(block: &mut i32, voxel: &mut i32, offset: i32, vps: i32) {
    *voxel += offset;
    if *voxel < 0 {
        *block -= 1;
        *voxel += vps;
    } else if *voxel >= vps {
        *block += 1;
        *voxel -= vps;
    }
}
