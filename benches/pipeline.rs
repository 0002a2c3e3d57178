//! Pipeline benchmarks.
//!
//! Measures full-frame processing against a warmed-up free-space region,
//! with a moving object sweeping through it.
//!
//! Run with: `cargo bench`

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use gati_detect::{
    BlockIndex, MotionDetector, MotionDetectorConfig, Point3, TsdfLayer, UpdateChannel,
};

const VOXEL_SIZE: f32 = 0.1;
const VOXELS_PER_SIDE: usize = 8;

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

fn mark_all_updated(tsdf: &TsdfLayer) {
    for (_, block) in tsdf.iter() {
        block.updated().set(UpdateChannel::Motion);
    }
}

/// A cloud sweeping diagonally through the free region.
fn sweep_cloud(n_points: usize, phase: f32) -> Vec<Point3> {
    (0..n_points)
        .map(|i| {
            let t = i as f32 / n_points as f32;
            Point3::new(
                -0.6 + 1.2 * t + phase,
                -0.4 + 0.8 * t,
                0.1 * (i % 7) as f32,
            )
        })
        .collect()
}

fn bench_process_frame(c: &mut Criterion) {
    let tsdf = free_region(1);
    let mut detector = MotionDetector::new(MotionDetectorConfig {
        neighbor_connectivity: 6,
        burn_in_period: 5,
        num_threads: 4,
        ..MotionDetectorConfig::default()
    })
    .unwrap();

    // Warm up the ever-free labels.
    let mut frame = 0u64;
    for _ in 0..6 {
        frame += 1;
        mark_all_updated(&tsdf);
        detector.process_frame(&[], &tsdf, frame).unwrap();
    }

    let cloud = sweep_cloud(4096, 0.0);
    c.bench_function("process_frame_4096_points", |b| {
        b.iter(|| {
            frame += 1;
            mark_all_updated(&tsdf);
            black_box(detector.process_frame(&cloud, &tsdf, frame).unwrap())
        })
    });
}

fn bench_quiet_frame(c: &mut Criterion) {
    let tsdf = free_region(1);
    let mut detector = MotionDetector::new(MotionDetectorConfig {
        neighbor_connectivity: 6,
        burn_in_period: 5,
        num_threads: 4,
        ..MotionDetectorConfig::default()
    })
    .unwrap();

    let mut frame = 0u64;
    for _ in 0..6 {
        frame += 1;
        mark_all_updated(&tsdf);
        detector.process_frame(&[], &tsdf, frame).unwrap();
    }

    c.bench_function("quiet_frame_all_blocks_updated", |b| {
        b.iter(|| {
            frame += 1;
            mark_all_updated(&tsdf);
            black_box(detector.process_frame(&[], &tsdf, frame).unwrap())
        })
    });
}

criterion_group!(benches, bench_process_frame, bench_quiet_frame);
criterion_main!(benches);
