//! Motion annotation layer, indexed parallel to the TSDF layer.

use std::collections::HashMap;

use crate::core::{BlockIndex, VoxelKey};
use crate::motion::voxel::{MotionVoxel, MotionVoxelState};

/// A cube of motion voxels mirroring one TSDF block.
#[derive(Debug)]
pub struct MotionBlock {
    voxels: Vec<MotionVoxel>,
    voxels_per_side: usize,
}

impl MotionBlock {
    fn new(voxels_per_side: usize) -> Self {
        let count = voxels_per_side * voxels_per_side * voxels_per_side;
        Self {
            voxels: (0..count).map(|_| MotionVoxel::default()).collect(),
            voxels_per_side,
        }
    }

    /// Number of voxels in the block.
    #[inline]
    pub fn num_voxels(&self) -> usize {
        self.voxels.len()
    }

    /// Voxel by flat linear index.
    #[inline]
    pub fn voxel(&self, linear: usize) -> &MotionVoxel {
        &self.voxels[linear]
    }

    /// Mutable voxel by flat linear index.
    #[inline]
    pub fn voxel_mut(&mut self, linear: usize) -> &mut MotionVoxel {
        &mut self.voxels[linear]
    }

    /// Voxel by local index.
    #[inline]
    pub fn voxel_at(&self, index: crate::core::VoxelIndex) -> &MotionVoxel {
        &self.voxels[index.linear(self.voxels_per_side)]
    }
}

/// Sparse collection of motion blocks. Owned by the detector; blocks are
/// created lazily to mirror TSDF blocks as they are first touched.
#[derive(Debug, Default)]
pub struct MotionLayer {
    blocks: HashMap<BlockIndex, MotionBlock>,
    voxels_per_side: usize,
}

impl MotionLayer {
    /// Create an empty layer. The geometry is locked in on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block edge length in voxels; zero until the first block exists.
    #[inline]
    pub fn voxels_per_side(&self) -> usize {
        self.voxels_per_side
    }

    /// Record the mirrored layer's geometry. Returns the previously
    /// locked value, zero if this is the first call.
    pub fn bind_geometry(&mut self, voxels_per_side: usize) -> usize {
        let previous = self.voxels_per_side;
        if previous == 0 {
            self.voxels_per_side = voxels_per_side;
        }
        previous
    }

    /// Look up a block by address.
    #[inline]
    pub fn block(&self, index: BlockIndex) -> Option<&MotionBlock> {
        self.blocks.get(&index)
    }

    /// Mutable block lookup.
    #[inline]
    pub fn block_mut(&mut self, index: BlockIndex) -> Option<&mut MotionBlock> {
        self.blocks.get_mut(&index)
    }

    /// Fetch or create the block mirroring a TSDF block.
    pub fn ensure_block(&mut self, index: BlockIndex) -> &mut MotionBlock {
        let vps = self.voxels_per_side;
        debug_assert!(vps > 0, "geometry must be bound before blocks exist");
        self.blocks
            .entry(index)
            .or_insert_with(|| MotionBlock::new(vps))
    }

    /// Look up a voxel by key.
    #[inline]
    pub fn voxel(&self, key: VoxelKey) -> Option<&MotionVoxel> {
        self.blocks
            .get(&key.block)
            .map(|b| b.voxel(key.voxel.linear(self.voxels_per_side)))
    }

    /// Mutable voxel lookup.
    #[inline]
    pub fn voxel_mut(&mut self, key: VoxelKey) -> Option<&mut MotionVoxel> {
        let vps = self.voxels_per_side;
        self.blocks
            .get_mut(&key.block)
            .map(|b| b.voxel_mut(key.voxel.linear(vps)))
    }

    /// Snapshot every voxel's motion state, keyed for comparison.
    pub fn snapshot(&self) -> HashMap<(BlockIndex, usize), MotionVoxelState> {
        let mut out = HashMap::new();
        for (index, block) in &self.blocks {
            for linear in 0..block.num_voxels() {
                out.insert((*index, linear), block.voxel(linear).state());
            }
        }
        out
    }
}
