//! Block-sparse TSDF map, the externally-owned collaborator.
//!
//! The mapping subsystem integrates sensor data into this layer and
//! raises every block's update channels as it goes. The motion detection
//! core reads `distance`/`weight`, consumes the `Motion` update channel,
//! and never allocates or removes blocks.

mod block;
mod layer;
mod voxel;

pub use block::{TsdfBlock, UpdateChannel, UpdateFlags};
pub use layer::TsdfLayer;
pub use voxel::{TsdfVoxel, WEIGHT_EPSILON};
