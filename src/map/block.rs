//! Fixed-size voxel block with per-channel update tracking.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::core::VoxelIndex;
use crate::map::voxel::TsdfVoxel;

/// Update channels on a block. Every consumer of the map owns exactly one
/// channel: the integrator raises all of them when it touches a block,
/// and each consumer clears only its own once it has caught up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateChannel {
    /// Map maintenance (the integrator's own bookkeeping).
    Map = 0,
    /// Surface extraction consumers.
    Mesh = 1,
    /// Motion detection (this crate).
    Motion = 2,
}

impl UpdateChannel {
    #[inline]
    fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Per-block update flags, one bit per channel. Atomic so a consumer can
/// clear its channel while holding a shared reference to the layer.
#[derive(Debug, Default)]
pub struct UpdateFlags(AtomicU8);

impl UpdateFlags {
    /// Raise one channel.
    #[inline]
    pub fn set(&self, channel: UpdateChannel) {
        self.0.fetch_or(channel.bit(), Ordering::Relaxed);
    }

    /// Raise every channel.
    #[inline]
    pub fn set_all(&self) {
        self.0.store(u8::MAX, Ordering::Relaxed);
    }

    /// Clear one channel.
    #[inline]
    pub fn clear(&self, channel: UpdateChannel) {
        self.0.fetch_and(!channel.bit(), Ordering::Relaxed);
    }

    /// Whether one channel is raised.
    #[inline]
    pub fn is_set(&self, channel: UpdateChannel) -> bool {
        self.0.load(Ordering::Relaxed) & channel.bit() != 0
    }
}

/// A cube of `voxels_per_side³` TSDF voxels.
#[derive(Debug)]
pub struct TsdfBlock {
    voxels: Vec<TsdfVoxel>,
    voxels_per_side: usize,
    updated: UpdateFlags,
}

impl TsdfBlock {
    /// Create a block of unobserved voxels.
    pub fn new(voxels_per_side: usize) -> Self {
        let count = voxels_per_side * voxels_per_side * voxels_per_side;
        Self {
            voxels: vec![TsdfVoxel::default(); count],
            voxels_per_side,
            updated: UpdateFlags::default(),
        }
    }

    /// Number of voxels in the block.
    #[inline]
    pub fn num_voxels(&self) -> usize {
        self.voxels.len()
    }

    /// Voxel by flat linear index.
    #[inline]
    pub fn voxel(&self, linear: usize) -> &TsdfVoxel {
        &self.voxels[linear]
    }

    /// Mutable voxel by flat linear index (integrator side).
    #[inline]
    pub fn voxel_mut(&mut self, linear: usize) -> &mut TsdfVoxel {
        &mut self.voxels[linear]
    }

    /// Voxel by local index.
    #[inline]
    pub fn voxel_at(&self, index: VoxelIndex) -> &TsdfVoxel {
        &self.voxels[index.linear(self.voxels_per_side)]
    }

    /// Mutable voxel by local index (integrator side).
    #[inline]
    pub fn voxel_at_mut(&mut self, index: VoxelIndex) -> &mut TsdfVoxel {
        &mut self.voxels[index.linear(self.voxels_per_side)]
    }

    /// Update flags for this block.
    #[inline]
    pub fn updated(&self) -> &UpdateFlags {
        &self.updated
    }
}
