//! Voxel-graph clustering and point labeling.
//!
//! Occupied ever-free voxels seed a breadth-first expansion over the
//! adjacency graph, restricted to voxels that are simultaneously
//! ever-free, occupied this frame, and unclaimed. The claim token is an
//! atomic check-and-set, so every voxel lands in exactly one cluster and
//! the resulting partition does not depend on seed order or scheduling.
//! Voxel clusters are then expanded to the points bucketed in their
//! member voxels, filtered, and labeled.

use std::collections::VecDeque;

use log::trace;

use crate::config::MotionDetectorConfig;
use crate::core::{Point3, PointClassification, VoxelKey};
use crate::error::ConfigError;
use crate::indexing::VoxelPointIndex;
use crate::motion::MotionLayer;
use crate::neighborhood::NeighborhoodSearch;

/// A connected set of voxels together with the points that fell into
/// them. Ephemeral: built, filtered, and discarded within one frame.
#[derive(Debug, Clone)]
pub struct PointCluster {
    /// Member voxels.
    pub voxels: Vec<VoxelKey>,
    /// Indices of member points in the input cloud.
    pub points: Vec<usize>,
}

/// Connected-component discovery and cluster-level filtering.
#[derive(Debug)]
pub struct ClusteringEngine {
    neighborhood: NeighborhoodSearch,
    min_cluster_points: usize,
    min_cluster_extent: f32,
}

impl ClusteringEngine {
    /// Build the engine from a validated configuration.
    pub fn new(config: &MotionDetectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            neighborhood: NeighborhoodSearch::new(config.neighbor_connectivity)?,
            min_cluster_points: config.min_cluster_points,
            min_cluster_extent: config.min_cluster_extent,
        })
    }

    /// Partition the seed voxels' connected components. Every maximal
    /// connected group of ever-free voxels occupied this frame ends up in
    /// exactly one cluster; seeds whose ever-free status was revoked
    /// earlier in the frame are dropped.
    pub fn voxel_clustering(
        &self,
        seeds: &[VoxelKey],
        frame: u64,
        motion: &MotionLayer,
    ) -> Vec<Vec<VoxelKey>> {
        let vps = motion.voxels_per_side();
        let mut clusters = Vec::new();

        for &seed in seeds {
            let Some(voxel) = motion.voxel(seed) else {
                continue;
            };
            if !voxel.is_ever_free() || !voxel.point_occupied_at(frame) {
                continue;
            }
            if !voxel.claim_for_clustering() {
                continue;
            }

            let mut cluster = vec![seed];
            let mut frontier = VecDeque::from([seed]);
            while let Some(current) = frontier.pop_front() {
                for neighbor in self.neighborhood.neighbors(current, vps) {
                    let Some(candidate) = motion.voxel(neighbor) else {
                        continue;
                    };
                    if !candidate.is_ever_free() || !candidate.point_occupied_at(frame) {
                        continue;
                    }
                    if !candidate.claim_for_clustering() {
                        continue;
                    }
                    cluster.push(neighbor);
                    frontier.push_back(neighbor);
                }
            }
            clusters.push(cluster);
        }
        clusters
    }

    /// Union each voxel cluster's point buckets into a point cluster.
    pub fn induce_point_clusters(
        &self,
        index: &VoxelPointIndex,
        voxel_clusters: Vec<Vec<VoxelKey>>,
    ) -> Vec<PointCluster> {
        voxel_clusters
            .into_iter()
            .map(|voxels| {
                let mut points = Vec::new();
                for key in &voxels {
                    points.extend_from_slice(index.bucket(*key));
                }
                PointCluster { voxels, points }
            })
            .collect()
    }

    /// Drop clusters failing the minimum point count or minimum spatial
    /// extent. This is where domain-specific noise rejection happens.
    pub fn apply_cluster_level_filters(
        &self,
        clusters: Vec<PointCluster>,
        points: &[Point3],
    ) -> Vec<PointCluster> {
        let before = clusters.len();
        let kept: Vec<PointCluster> = clusters
            .into_iter()
            .filter(|cluster| {
                cluster.points.len() >= self.min_cluster_points
                    && cluster_extent(cluster, points) >= self.min_cluster_extent
            })
            .collect();
        if kept.len() != before {
            trace!("cluster filters dropped {} of {} clusters", before - kept.len(), before);
        }
        kept
    }

    /// Label every point of the surviving clusters as cluster-level
    /// dynamic and mark their member voxels as moving.
    pub fn set_cluster_level_dynamic(
        &self,
        clusters: &[PointCluster],
        classifications: &mut [PointClassification],
        motion: &mut MotionLayer,
    ) {
        for cluster in clusters {
            for &point in &cluster.points {
                classifications[point].cluster_level_dynamic = true;
            }
            for &key in &cluster.voxels {
                if let Some(voxel) = motion.voxel_mut(key) {
                    voxel.dynamic = true;
                }
            }
        }
    }
}

/// Diagonal of the axis-aligned bounding box of the cluster's points.
/// A single-point cluster has extent zero.
fn cluster_extent(cluster: &PointCluster, points: &[Point3]) -> f32 {
    let mut iter = cluster.points.iter().map(|&i| points[i]);
    let Some(first) = iter.next() else {
        return 0.0;
    };
    let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
    (max - min).norm()
}
