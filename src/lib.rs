//! # Gati-Detect: Moving-Object Detection in 3D Lidar Scans
//!
//! Classifies each point of a streamed 3D scan as static or moving using
//! a persistent volumetric occupancy map that is updated scan-by-scan.
//! The detector maintains an "ever-free" label per voxel: free space
//! observed long enough, with an observed and equally quiet
//! neighborhood, is trusted as background. Points that reappear inside
//! ever-free voxels are grouped into connected voxel clusters and
//! labeled dynamic.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gati_detect::{MotionDetector, MotionDetectorConfig, Point3, TsdfLayer};
//!
//! // The TSDF layer is owned by the mapping subsystem; the detector
//! // only borrows it per frame.
//! let tsdf = TsdfLayer::new(0.2, 16);
//! let mut detector = MotionDetector::new(MotionDetectorConfig::default()).unwrap();
//!
//! let cloud = vec![Point3::new(1.0, 0.5, 0.2)];
//! let result = detector.process_frame(&cloud, &tsdf, 1).unwrap();
//! for (point, class) in cloud.iter().zip(&result.classifications) {
//!     if class.cluster_level_dynamic {
//!         println!("moving: ({:.2}, {:.2}, {:.2})", point.x, point.y, point.z);
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!                     ┌──────────────────┐
//!                     │   Point Cloud    │  (world frame, one scan)
//!                     └────────┬─────────┘
//!                              ▼
//!                  ┌───────────────────────┐
//!                  │   VoxelPointIndexer   │  bucket map + seed voxels
//!                  │  (fork-join phase 1)  │
//!                  └───────────┬───────────┘
//!                              ▼
//!                  ┌───────────────────────┐
//!                  │   EverFreeIntegrator  │  occupancy counters,
//!                  │  (fork-join phase 2)  │  revoke / grant ever-free
//!                  └───────────┬───────────┘
//!                              ▼
//!                  ┌───────────────────────┐
//!                  │   ClusteringEngine    │  BFS components, filters,
//!                  │   (claim-serialized)  │  point labels
//!                  └───────────┬───────────┘
//!                              ▼
//!                  ┌───────────────────────┐
//!                  │  PointClassification  │  one record per point
//!                  └───────────────────────┘
//! ```
//!
//! Both fork-join phases partition work by whole blocks on a persistent
//! worker pool; a block is mutated by at most one worker per phase, and
//! cross-block reads only touch fields frozen earlier in the frame.
//!
//! ## Modules
//!
//! - [`core`]: points, grid addressing, classification records
//! - [`map`]: the block-sparse TSDF layer (externally owned collaborator)
//! - [`motion`]: the motion annotation layer owned by this crate
//! - [`neighborhood`]: 6/18/26-connectivity adjacency
//! - [`indexing`]: per-frame voxel-point bucketing
//! - [`ever_free`]: the temporal ever-free state machine
//! - [`clustering`]: connected components and cluster-level filtering
//! - [`detector`]: the per-frame orchestrator

pub mod clustering;
pub mod config;
pub mod core;
pub mod detector;
pub mod error;
pub mod ever_free;
pub mod indexing;
pub mod map;
pub mod motion;
pub mod neighborhood;

pub use config::MotionDetectorConfig;
pub use core::{
    BlockIndex, FrameResult, FrameStats, Point3, PointClassification, TimingBreakdown, VoxelIndex,
    VoxelKey,
};
pub use detector::MotionDetector;
pub use error::{ConfigError, FrameError};
pub use map::{TsdfLayer, TsdfVoxel, UpdateChannel};
