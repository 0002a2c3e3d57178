//! Block-sparse TSDF layer.
//!
//! The layer is owned by the externally-managed mapping subsystem. The
//! motion detection core holds only a shared reference and never inserts,
//! removes, or resizes blocks; `allocate_block` exists for the external
//! integrator and for tests that play its role. All lookups return an
//! explicit `Option` rather than nullable pointers.

use std::collections::HashMap;

use crate::core::{BlockIndex, Point3, VoxelKey};
use crate::map::block::{TsdfBlock, UpdateChannel};
use crate::map::voxel::TsdfVoxel;

/// Sparse collection of voxel blocks keyed by integer block address.
#[derive(Debug)]
pub struct TsdfLayer {
    blocks: HashMap<BlockIndex, TsdfBlock>,
    voxel_size: f32,
    voxels_per_side: usize,
}

impl TsdfLayer {
    /// Create an empty layer. `voxel_size` is the voxel edge length in
    /// meters, `voxels_per_side` the block edge length in voxels.
    pub fn new(voxel_size: f32, voxels_per_side: usize) -> Self {
        assert!(voxel_size > 0.0, "voxel_size must be positive");
        assert!(voxels_per_side > 0, "voxels_per_side must be positive");
        Self {
            blocks: HashMap::new(),
            voxel_size,
            voxels_per_side,
        }
    }

    /// Voxel edge length in meters.
    #[inline]
    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    /// Block edge length in voxels.
    #[inline]
    pub fn voxels_per_side(&self) -> usize {
        self.voxels_per_side
    }

    /// Block edge length in meters.
    #[inline]
    pub fn block_size(&self) -> f32 {
        self.voxel_size * self.voxels_per_side as f32
    }

    /// Number of allocated blocks.
    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Look up a block by address.
    #[inline]
    pub fn block(&self, index: BlockIndex) -> Option<&TsdfBlock> {
        self.blocks.get(&index)
    }

    /// Mutable block lookup (integrator side).
    #[inline]
    pub fn block_mut(&mut self, index: BlockIndex) -> Option<&mut TsdfBlock> {
        self.blocks.get_mut(&index)
    }

    /// Allocate (or fetch) a block. Integrator side only: the motion
    /// detection core never calls this.
    pub fn allocate_block(&mut self, index: BlockIndex) -> &mut TsdfBlock {
        let vps = self.voxels_per_side;
        self.blocks
            .entry(index)
            .or_insert_with(|| TsdfBlock::new(vps))
    }

    /// Look up a voxel by key.
    #[inline]
    pub fn voxel(&self, key: VoxelKey) -> Option<&TsdfVoxel> {
        self.block(key.block).map(|b| b.voxel_at(key.voxel))
    }

    /// The key of the voxel containing a world point.
    #[inline]
    pub fn voxel_key_of(&self, point: Point3) -> VoxelKey {
        let global = [
            (point.x / self.voxel_size).floor() as i64,
            (point.y / self.voxel_size).floor() as i64,
            (point.z / self.voxel_size).floor() as i64,
        ];
        VoxelKey::from_global(global, self.voxels_per_side)
    }

    /// The address of the block containing a world point.
    #[inline]
    pub fn block_index_of(&self, point: Point3) -> BlockIndex {
        self.voxel_key_of(point).block
    }

    /// Center of a voxel in world coordinates.
    pub fn voxel_center(&self, key: VoxelKey) -> Point3 {
        let g = key.to_global(self.voxels_per_side);
        Point3::new(
            (g[0] as f32 + 0.5) * self.voxel_size,
            (g[1] as f32 + 0.5) * self.voxel_size,
            (g[2] as f32 + 0.5) * self.voxel_size,
        )
    }

    /// Iterate over all allocated blocks.
    pub fn iter(&self) -> impl Iterator<Item = (&BlockIndex, &TsdfBlock)> {
        self.blocks.iter()
    }

    /// Addresses of all blocks whose given update channel is raised.
    /// Flags are not cleared by the query; each consumer clears its own
    /// channel per block once it has processed it.
    pub fn updated_blocks(&self, channel: UpdateChannel) -> Vec<BlockIndex> {
        self.blocks
            .iter()
            .filter(|(_, block)| block.updated().is_set(channel))
            .map(|(index, _)| *index)
            .collect()
    }
}
