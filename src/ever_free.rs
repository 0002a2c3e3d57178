//! The ever-free state machine.
//!
//! A voxel earns the ever-free label after staying unoccupied for a full
//! burn-in period with an observed, equally quiescent neighborhood, and
//! loses it (together with its whole neighborhood) once its occupancy
//! counter proves it occupied. Per frame the update runs three steps over
//! the blocks whose motion channel is marked updated:
//!
//! 1. occupancy accounting with a temporal-buffer grace window, plus
//!    decay of the dynamic label (sequential);
//! 2. revocation of ever-free status with neighbor contamination
//!    (sequential, always before granting so stale grants are not
//!    re-confirmed within the frame);
//! 3. granting of new ever-free labels (parallel per block; reads are
//!    frozen by steps 1–2, writes stay inside the worker's own block).
//!
//! Each block's motion channel is cleared as its grant pass finishes, so
//! an untouched block costs nothing next frame.

use std::sync::atomic::Ordering;

use log::trace;
use rayon::prelude::*;

use crate::config::MotionDetectorConfig;
use crate::core::{BlockIndex, VoxelIndex, VoxelKey};
use crate::error::ConfigError;
use crate::map::{TsdfLayer, UpdateChannel, WEIGHT_EPSILON};
use crate::motion::MotionLayer;
use crate::neighborhood::NeighborhoodSearch;

/// Temporal state machine maintaining per-voxel ever-free status.
#[derive(Debug)]
pub struct EverFreeIntegrator {
    counter_to_reset: u32,
    temporal_buffer: u64,
    burn_in_period: u64,
    tsdf_occupancy_threshold: f32,
    neighborhood: NeighborhoodSearch,
}

impl EverFreeIntegrator {
    /// Build the integrator from a validated configuration.
    pub fn new(config: &MotionDetectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            counter_to_reset: config.counter_to_reset,
            temporal_buffer: config.temporal_buffer as u64,
            burn_in_period: config.burn_in_period as u64,
            tsdf_occupancy_threshold: config.tsdf_occupancy_threshold,
            neighborhood: NeighborhoodSearch::new(config.neighbor_connectivity)?,
        })
    }

    /// Run the per-frame update over all blocks marked updated on the
    /// motion channel. Returns the number of such blocks.
    pub fn update(
        &self,
        tsdf: &TsdfLayer,
        motion: &mut MotionLayer,
        frame: u64,
        pool: &rayon::ThreadPool,
    ) -> usize {
        let updated = tsdf.updated_blocks(UpdateChannel::Motion);
        if updated.is_empty() {
            return 0;
        }
        let vps = tsdf.voxels_per_side();

        // Occupancy accounting. Deferred revocation keys collect here so
        // neighbor mutation does not interleave with the block scan.
        let mut to_revoke: Vec<VoxelKey> = Vec::new();
        for &block_index in &updated {
            let Some(block) = tsdf.block(block_index) else {
                continue;
            };
            let motion_block = motion.ensure_block(block_index);
            for linear in 0..block.num_voxels() {
                let tsdf_voxel = block.voxel(linear);
                let voxel = motion_block.voxel_mut(linear);
                let last_point = voxel.last_point_occupied.load(Ordering::Relaxed);

                if tsdf_voxel.distance < self.tsdf_occupancy_threshold || last_point == frame {
                    if voxel.last_occupied + self.temporal_buffer >= frame {
                        voxel.occ_counter += 1;
                    } else {
                        voxel.occ_counter = 1;
                    }
                    voxel.last_occupied = frame;
                }
                if last_point + self.temporal_buffer < frame {
                    voxel.dynamic = false;
                }
                if voxel.occ_counter >= self.counter_to_reset {
                    to_revoke.push(VoxelKey::new(
                        block_index,
                        VoxelIndex::from_linear(linear, vps),
                    ));
                }
            }
        }

        if !to_revoke.is_empty() {
            trace!("revoking ever-free on {} voxels (frame {frame})", to_revoke.len());
        }
        for key in to_revoke {
            self.revoke(motion, key, vps);
        }

        // Granting, blockwise in parallel on the persistent pool.
        let motion_ref: &MotionLayer = motion;
        pool.install(|| {
            updated.par_iter().for_each(|&block_index| {
                self.grant_block(tsdf, motion_ref, block_index, frame, vps);
            });
        });

        updated.len()
    }

    /// Clear ever-free and dynamic on a voxel and its whole neighborhood.
    /// A cell proven occupied invalidates trust in its surroundings too.
    fn revoke(&self, motion: &mut MotionLayer, key: VoxelKey, vps: usize) {
        if let Some(voxel) = motion.voxel_mut(key) {
            *voxel.ever_free.get_mut() = false;
            voxel.dynamic = false;
        }
        for neighbor in self.neighborhood.neighbors(key, vps) {
            if let Some(voxel) = motion.voxel_mut(neighbor) {
                *voxel.ever_free.get_mut() = false;
                voxel.dynamic = false;
            }
        }
    }

    /// Grant ever-free to every qualifying voxel of one block, then clear
    /// the block's motion channel.
    fn grant_block(
        &self,
        tsdf: &TsdfLayer,
        motion: &MotionLayer,
        block_index: BlockIndex,
        frame: u64,
        vps: usize,
    ) {
        let Some(block) = tsdf.block(block_index) else {
            return;
        };
        let Some(motion_block) = motion.block(block_index) else {
            block.updated().clear(UpdateChannel::Motion);
            return;
        };

        for linear in 0..block.num_voxels() {
            let voxel = motion_block.voxel(linear);
            // Already ever-free saves the neighborhood check; unobserved
            // voxels can never be granted.
            if voxel.is_ever_free() {
                continue;
            }
            if block.voxel(linear).weight <= WEIGHT_EPSILON {
                continue;
            }
            if voxel.last_occupied + self.burn_in_period > frame {
                continue;
            }

            let key = VoxelKey::new(block_index, VoxelIndex::from_linear(linear, vps));
            if self.neighborhood_quiescent(tsdf, motion, key, frame, vps) {
                voxel.ever_free.store(true, Ordering::Relaxed);
            }
        }
        block.updated().clear(UpdateChannel::Motion);
    }

    /// Whether every neighbor exists, is observed, and has been
    /// unoccupied for the burn-in period. A missing neighbor block fails
    /// closed: no grants next to unmapped space.
    fn neighborhood_quiescent(
        &self,
        tsdf: &TsdfLayer,
        motion: &MotionLayer,
        key: VoxelKey,
        frame: u64,
        vps: usize,
    ) -> bool {
        for neighbor in self.neighborhood.neighbors(key, vps) {
            let Some(neighbor_block) = tsdf.block(neighbor.block) else {
                return false;
            };
            if neighbor_block.voxel_at(neighbor.voxel).weight <= WEIGHT_EPSILON {
                return false;
            }
            let last_occupied = motion
                .voxel(neighbor)
                .map(|v| v.last_occupied)
                .unwrap_or(0);
            if last_occupied + self.burn_in_period > frame {
                return false;
            }
        }
        true
    }
}
