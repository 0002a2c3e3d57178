//! Frame orchestration.
//!
//! `MotionDetector` owns everything the pipeline keeps between frames:
//! the validated configuration, the persistent worker pool, the motion
//! annotation layer, and the last processed frame number. The TSDF layer
//! is borrowed per call and never structurally modified.
//!
//! Per frame, strictly sequenced:
//!
//! 1. bucket the cloud into voxels and collect clustering seeds
//!    (fork-join phase one);
//! 2. run the ever-free state machine over the touched blocks
//!    (sequential accounting/revocation, then fork-join phase two);
//! 3. cluster the seeds, induce and filter point clusters, label points;
//! 4. raise `filtered_out` on every cluster-level dynamic point.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use log::{debug, info, warn};

use crate::clustering::ClusteringEngine;
use crate::config::MotionDetectorConfig;
use crate::core::{FrameResult, FrameStats, Point3, PointClassification, TimingBreakdown};
use crate::error::{ConfigError, FrameError};
use crate::ever_free::EverFreeIntegrator;
use crate::indexing;
use crate::map::TsdfLayer;
use crate::motion::MotionLayer;

/// The spatio-temporal voxel classification engine.
pub struct MotionDetector {
    config: MotionDetectorConfig,
    pool: rayon::ThreadPool,
    ever_free: EverFreeIntegrator,
    clustering: ClusteringEngine,
    motion: MotionLayer,
    last_frame: u64,
}

impl MotionDetector {
    /// Validate the configuration and build the engine, including its
    /// persistent worker pool.
    pub fn new(config: MotionDetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .thread_name(|i| format!("gati-worker-{i}"))
            .build()
            .map_err(|e| ConfigError::ThreadPool(e.to_string()))?;

        let ever_free = EverFreeIntegrator::new(&config)?;
        let clustering = ClusteringEngine::new(&config)?;

        info!(
            "motion detector ready: connectivity {}, burn-in {} frames, {} workers",
            config.neighbor_connectivity, config.burn_in_period, config.num_threads
        );

        Ok(Self {
            config,
            pool,
            ever_free,
            clustering,
            motion: MotionLayer::new(),
            last_frame: 0,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &MotionDetectorConfig {
        &self.config
    }

    /// The motion annotation layer, for inspection.
    pub fn motion_layer(&self) -> &MotionLayer {
        &self.motion
    }

    /// Classify one frame of points against the map.
    ///
    /// `frame` is the caller-supplied counter and must increase between
    /// calls. On success the result carries one classification per input
    /// point, index-aligned. A failed frame is dropped as a whole and the
    /// detector stays usable.
    pub fn process_frame(
        &mut self,
        points: &[Point3],
        tsdf: &TsdfLayer,
        frame: u64,
    ) -> Result<FrameResult, FrameError> {
        if frame <= self.last_frame {
            return Err(FrameError::NonMonotonicFrame {
                got: frame,
                last: self.last_frame,
            });
        }
        let bound = self.motion.voxels_per_side();
        if bound != 0 && bound != tsdf.voxels_per_side() {
            return Err(FrameError::LayerMismatch {
                expected: bound,
                got: tsdf.voxels_per_side(),
            });
        }
        self.motion.bind_geometry(tsdf.voxels_per_side());

        let mut classifications = vec![PointClassification::default(); points.len()];
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.run_pipeline(points, tsdf, frame, &mut classifications)
        }));
        self.last_frame = frame;

        match outcome {
            Ok(stats) => {
                debug!(
                    "frame {frame}: {} blocks updated, {} seeds, {}/{} clusters kept, {} dynamic points ({} µs)",
                    stats.blocks_updated,
                    stats.seed_voxels,
                    stats.clusters_kept,
                    stats.clusters_found,
                    stats.dynamic_points,
                    stats.timing.total_us
                );
                Ok(FrameResult {
                    classifications,
                    stats,
                })
            }
            Err(payload) => {
                let message = panic_message(&payload);
                warn!("frame {frame} dropped, worker task failed: {message}");
                Err(FrameError::Worker(message))
            }
        }
    }

    fn run_pipeline(
        &mut self,
        points: &[Point3],
        tsdf: &TsdfLayer,
        frame: u64,
        classifications: &mut [PointClassification],
    ) -> FrameStats {
        let start = Instant::now();

        let index = indexing::build_index(
            points,
            tsdf,
            &mut self.motion,
            frame,
            &self.pool,
            classifications,
        );
        let after_indexing = start.elapsed();

        let blocks_updated = self
            .ever_free
            .update(tsdf, &mut self.motion, frame, &self.pool);
        let after_ever_free = start.elapsed();

        let voxel_clusters = self
            .clustering
            .voxel_clustering(&index.seeds, frame, &self.motion);
        let clusters_found = voxel_clusters.len();
        let point_clusters = self.clustering.induce_point_clusters(&index, voxel_clusters);
        let kept = self
            .clustering
            .apply_cluster_level_filters(point_clusters, points);
        self.clustering
            .set_cluster_level_dynamic(&kept, classifications, &mut self.motion);

        // Downstream consumers treat every cluster-level dynamic point as
        // not-a-static-surface.
        let mut dynamic_points = 0;
        for classification in classifications.iter_mut() {
            if classification.cluster_level_dynamic {
                classification.filtered_out = true;
                dynamic_points += 1;
            }
        }
        let total = start.elapsed();

        FrameStats {
            blocks_updated,
            seed_voxels: index.seeds.len(),
            clusters_found,
            clusters_kept: kept.len(),
            dynamic_points,
            timing: TimingBreakdown {
                indexing_us: after_indexing.as_micros() as u64,
                ever_free_us: (after_ever_free - after_indexing).as_micros() as u64,
                clustering_us: (total - after_ever_free).as_micros() as u64,
                total_us: total.as_micros() as u64,
            },
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
