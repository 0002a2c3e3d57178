//! Motion annotation state, stored parallel to the external TSDF map.
//!
//! The mapping subsystem owns the TSDF voxels; every field the motion
//! pipeline mutates lives here instead, so each voxel field has exactly
//! one writing subsystem.

mod layer;
mod voxel;

pub use layer::{MotionBlock, MotionLayer};
pub use voxel::{MotionVoxel, MotionVoxelState};
