//! Voxel-point bucketing for one frame.
//!
//! Groups the incoming cloud into block → voxel → point-index buckets,
//! marks the hit voxels as occupied this frame, and collects the seed
//! voxels for the clustering pass. Bucketing is the first of the frame's
//! two fork-join phases: each worker owns one block's voxel mutations,
//! so no two workers ever write the same voxel.

use std::collections::HashMap;
use std::sync::atomic::Ordering;

use rayon::prelude::*;

use crate::core::{BlockIndex, Point3, PointClassification, VoxelIndex, VoxelKey};
use crate::map::TsdfLayer;
use crate::motion::MotionLayer;

/// Complete race-free summary of which voxels and points are live this
/// frame.
#[derive(Debug, Default)]
pub struct VoxelPointIndex {
    /// Point indices bucketed per block, per voxel.
    pub buckets: HashMap<BlockIndex, HashMap<VoxelIndex, Vec<usize>>>,
    /// Voxels that are both occupied this frame and ever-free; these
    /// seed the clustering expansion.
    pub seeds: Vec<VoxelKey>,
}

impl VoxelPointIndex {
    /// Point indices bucketed in one voxel, empty if none.
    pub fn bucket(&self, key: VoxelKey) -> &[usize] {
        self.buckets
            .get(&key.block)
            .and_then(|block| block.get(&key.voxel))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Bucket a frame's points and collect clustering seeds.
///
/// Points falling into blocks the map has not allocated are skipped;
/// that is the expected condition near map boundaries, not an error.
/// Points in voxels that are already ever-free get their
/// `ever_free_level_dynamic` flag raised.
pub fn build_index(
    points: &[Point3],
    tsdf: &TsdfLayer,
    motion: &mut MotionLayer,
    frame: u64,
    pool: &rayon::ThreadPool,
    classifications: &mut [PointClassification],
) -> VoxelPointIndex {
    debug_assert_eq!(points.len(), classifications.len());

    // Group point indices by containing block.
    let mut by_block: HashMap<BlockIndex, Vec<usize>> = HashMap::new();
    for (i, point) in points.iter().enumerate() {
        by_block.entry(tsdf.block_index_of(*point)).or_default().push(i);
    }
    let groups: Vec<(BlockIndex, Vec<usize>)> = by_block.into_iter().collect();

    // Mirror every mapped block before the parallel phase; workers only
    // ever see existing motion blocks.
    for (block_index, _) in &groups {
        if tsdf.block(*block_index).is_some() {
            motion.ensure_block(*block_index);
        }
    }

    let vps = tsdf.voxels_per_side();
    let motion_ref: &MotionLayer = motion;

    type BlockResult = (BlockIndex, HashMap<VoxelIndex, Vec<usize>>, Vec<usize>);
    let results: Vec<Option<BlockResult>> = pool.install(|| {
        groups
            .par_iter()
            .map(|(block_index, point_indices)| -> Option<BlockResult> {
                tsdf.block(*block_index)?;
                let block = motion_ref.block(*block_index)?;

                let mut buckets: HashMap<VoxelIndex, Vec<usize>> = HashMap::new();
                let mut ever_free_hits = Vec::new();
                for &i in point_indices {
                    let key = tsdf.voxel_key_of(points[i]);
                    let voxel = block.voxel(key.voxel.linear(vps));
                    voxel.last_point_occupied.store(frame, Ordering::Relaxed);
                    voxel.clustering_processed.store(false, Ordering::Relaxed);
                    if voxel.is_ever_free() {
                        ever_free_hits.push(i);
                    }
                    buckets.entry(key.voxel).or_default().push(i);
                }
                Some((*block_index, buckets, ever_free_hits))
            })
            .collect()
    });

    // Single-threaded join: point flags, then the seed scan over every
    // touched voxel.
    let mut index = VoxelPointIndex::default();
    for (block_index, buckets, ever_free_hits) in results.into_iter().flatten() {
        for i in ever_free_hits {
            classifications[i].ever_free_level_dynamic = true;
        }
        let Some(block) = motion.block(block_index) else {
            continue;
        };
        for voxel_index in buckets.keys() {
            if block.voxel(voxel_index.linear(vps)).is_ever_free() {
                index.seeds.push(VoxelKey::new(block_index, *voxel_index));
            }
        }
        index.buckets.insert(block_index, buckets);
    }
    index
}
