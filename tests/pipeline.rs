//! End-to-end pipeline scenarios.
//!
//! These tests play the role of the external mapping subsystem: they
//! allocate blocks, write TSDF weights and distances, and raise the
//! per-block update channels the way the integrator would after fusing
//! a scan.

use gati_detect::{
    BlockIndex, MotionDetector, MotionDetectorConfig, Point3, TsdfLayer, UpdateChannel,
};

const VOXEL_SIZE: f32 = 0.1;
const VOXELS_PER_SIDE: usize = 8;

/// Allocate a cube of fully observed free-space blocks spanning the
/// given block-index range on every axis.
fn free_region(radius: i32) -> TsdfLayer {
    let mut tsdf = TsdfLayer::new(VOXEL_SIZE, VOXELS_PER_SIDE);
    for z in -radius..=radius {
        for y in -radius..=radius {
            for x in -radius..=radius {
                let block = tsdf.allocate_block(BlockIndex::new(x, y, z));
                for linear in 0..block.num_voxels() {
                    let voxel = block.voxel_mut(linear);
                    voxel.weight = 1.0;
                    voxel.distance = 10.0;
                }
            }
        }
    }
    tsdf
}

/// Raise the motion update channel on every block, as the integrator
/// does after fusing a scan.
fn mark_all_updated(tsdf: &TsdfLayer) {
    for (_, block) in tsdf.iter() {
        block.updated().set(UpdateChannel::Motion);
    }
}

fn make_detector() -> MotionDetector {
    let _ = env_logger::builder().is_test(true).try_init();
    MotionDetector::new(MotionDetectorConfig {
        neighbor_connectivity: 6,
        counter_to_reset: 3,
        temporal_buffer: 2,
        burn_in_period: 5,
        tsdf_occupancy_threshold: 0.2,
        num_threads: 4,
        min_cluster_points: 3,
        min_cluster_extent: 0.0,
    })
    .unwrap()
}

/// Run quiet frames so the free region earns its ever-free labels.
fn burn_in(detector: &mut MotionDetector, tsdf: &TsdfLayer, frames: std::ops::RangeInclusive<u64>) {
    for frame in frames {
        mark_all_updated(tsdf);
        detector.process_frame(&[], tsdf, frame).unwrap();
    }
}

/// A small object: six points spread over two adjacent voxels near the
/// origin, plus an optional per-frame offset.
fn object_cloud(offset: f32) -> Vec<Point3> {
    vec![
        Point3::new(0.02 + offset, 0.05, 0.05),
        Point3::new(0.04 + offset, 0.03, 0.06),
        Point3::new(0.06 + offset, 0.07, 0.04),
        Point3::new(0.08 + offset, 0.05, 0.05),
        Point3::new(0.12 + offset, 0.05, 0.05),
        Point3::new(0.17 + offset, 0.04, 0.06),
    ]
}

#[test]
fn moving_object_is_detected_and_filtered() {
    let tsdf = free_region(1);
    let mut detector = make_detector();
    burn_in(&mut detector, &tsdf, 1..=5);

    let mut cloud = object_cloud(0.0);
    // One lone point in a distant ever-free voxel: real occupancy, but
    // too small to survive the cluster filters.
    cloud.push(Point3::new(0.55, -0.35, 0.25));
    // One point at the outer rim of the mapped region, where voxels
    // never became ever-free.
    cloud.push(Point3::new(1.55, 1.55, 1.55));

    mark_all_updated(&tsdf);
    let result = detector.process_frame(&cloud, &tsdf, 6).unwrap();

    assert_eq!(result.classifications.len(), cloud.len());
    assert_eq!(result.stats.clusters_found, 2);
    assert_eq!(result.stats.clusters_kept, 1);
    assert_eq!(result.stats.dynamic_points, 6);

    for classification in &result.classifications[..6] {
        assert!(classification.ever_free_level_dynamic);
        assert!(classification.cluster_level_dynamic);
        assert!(classification.filtered_out);
    }

    // The lone point is flagged at the ever-free level only.
    let lone = &result.classifications[6];
    assert!(lone.ever_free_level_dynamic);
    assert!(!lone.cluster_level_dynamic);
    assert!(!lone.filtered_out);

    // The rim point sits in a voxel that was never trusted as free.
    let rim = &result.classifications[7];
    assert!(!rim.ever_free_level_dynamic);
    assert!(!rim.cluster_level_dynamic);
    assert!(!rim.filtered_out);
}

#[test]
fn persistent_occupancy_revokes_ever_free() {
    let tsdf = free_region(1);
    let mut detector = make_detector();
    burn_in(&mut detector, &tsdf, 1..=5);

    let cloud = object_cloud(0.0);

    // Two consecutive occupied frames: still below the reset counter,
    // the object keeps being reported.
    for frame in 6..=7 {
        mark_all_updated(&tsdf);
        let result = detector.process_frame(&cloud, &tsdf, frame).unwrap();
        assert_eq!(result.stats.clusters_kept, 1, "frame {frame}");
        assert!(result.classifications[0].cluster_level_dynamic);
    }

    // Third consecutive frame: the occupancy counter reaches the reset
    // threshold and the voxels lose their ever-free status before the
    // clustering pass runs.
    mark_all_updated(&tsdf);
    let result = detector.process_frame(&cloud, &tsdf, 8).unwrap();
    assert!(result.classifications[0].ever_free_level_dynamic);
    assert!(!result.classifications[0].cluster_level_dynamic);
    assert_eq!(result.stats.clusters_kept, 0);

    // From now on the spot is treated as background.
    mark_all_updated(&tsdf);
    let result = detector.process_frame(&cloud, &tsdf, 9).unwrap();
    for classification in &result.classifications {
        assert!(!classification.ever_free_level_dynamic);
        assert!(!classification.cluster_level_dynamic);
        assert!(!classification.filtered_out);
    }
}

#[test]
fn object_moving_through_free_space_stays_dynamic() {
    let tsdf = free_region(1);
    let mut detector = make_detector();
    burn_in(&mut detector, &tsdf, 1..=5);

    // The object shifts by two voxels per frame, so it never stacks
    // enough occupancy on one voxel to trigger a revocation.
    for (i, frame) in (6u64..=9).enumerate() {
        let cloud = object_cloud(i as f32 * 0.2);
        mark_all_updated(&tsdf);
        let result = detector.process_frame(&cloud, &tsdf, frame).unwrap();
        assert_eq!(result.stats.clusters_kept, 1, "frame {frame}");
        assert_eq!(result.stats.dynamic_points, cloud.len(), "frame {frame}");
    }
}

#[test]
fn quiet_region_recovers_after_object_leaves() {
    let tsdf = free_region(1);
    let mut detector = make_detector();
    burn_in(&mut detector, &tsdf, 1..=5);

    // Occupy long enough to revoke.
    for frame in 6..=8 {
        mark_all_updated(&tsdf);
        detector
            .process_frame(&object_cloud(0.0), &tsdf, frame)
            .unwrap();
    }

    // Quiet frames: burn-in runs again over the revoked spot.
    burn_in(&mut detector, &tsdf, 9..=13);

    mark_all_updated(&tsdf);
    let result = detector.process_frame(&object_cloud(0.0), &tsdf, 14).unwrap();
    assert_eq!(result.stats.clusters_kept, 1);
    assert!(result.classifications[0].ever_free_level_dynamic);
    assert!(result.classifications[0].filtered_out);
}
