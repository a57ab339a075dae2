//! Region-growing ("filling") segmentation of a capture.
//!
//! Walks the cube map in texel order. Every unassigned geometry texel seeds
//! a region that floods into edge neighbours (across face seams) while the
//! metric distance between adjacent samples stays within the tolerance.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

use crate::metric::SampleMetric;
use probesh_core::cube::{texel_neighbors, Texel};
use probesh_core::{ClusteringError, SampleBatch};
use std::collections::VecDeque;

/// Filling configuration.
#[derive(Clone, Debug)]
pub struct FillingConfig {
    /// Largest metric distance between two adjacent samples of a region.
    pub tolerance: f32,
    /// Regions with fewer samples are discarded (left unassigned).
    pub min_set_size: usize,
}

impl Default for FillingConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.1,
            min_set_size: 1,
        }
    }
}

/// Reusable buffers for the flood fill.
#[derive(Default)]
pub struct FillingState {
    queue: VecDeque<usize>,
    region_sizes: Vec<usize>,
    id_map: Vec<i32>,
    /// Regions grown by the last run, before size filtering.
    pub regions_grown: usize,
}

/// Region-growing clustering.
pub struct FillingClustering {
    config: FillingConfig,
}

impl FillingClustering {
    pub fn new(config: FillingConfig) -> Self {
        Self { config }
    }

    pub fn create_state(&self) -> FillingState {
        FillingState::default()
    }

    /// Writes region ids into `batch.set_id` and returns the region count.
    pub fn cluster(
        &self,
        batch: &mut SampleBatch,
        metric: &SampleMetric,
        state: &mut FillingState,
    ) -> Result<usize, ClusteringError> {
        if !batch.is_complete() {
            return Err(ClusteringError::LabelMismatch {
                samples: SampleBatch::texel_count(batch.face_size),
                labels: batch.len(),
            });
        }

        batch.reset_sets();
        let size = batch.face_size;
        state.region_sizes.clear();
        state.queue.clear();

        for seed in 0..batch.len() {
            if batch.is_sky(seed) || batch.set_id[seed] >= 0 {
                continue;
            }

            let region = state.region_sizes.len() as i32;
            batch.set_id[seed] = region;
            state.queue.push_back(seed);
            let mut count = 0usize;

            while let Some(current) = state.queue.pop_front() {
                count += 1;
                let Ok(texel) = Texel::from_index(size, current) else {
                    continue;
                };
                for neighbor in texel_neighbors(size, texel) {
                    let n = neighbor.index(size);
                    if batch.set_id[n] >= 0 || batch.is_sky(n) {
                        continue;
                    }
                    if metric.sample_distance(batch, current, n) <= self.config.tolerance {
                        batch.set_id[n] = region;
                        state.queue.push_back(n);
                    }
                }
            }
            state.region_sizes.push(count);
        }

        state.regions_grown = state.region_sizes.len();
        if state.regions_grown == 0 {
            return Err(ClusteringError::NoGeometry);
        }

        // Drop small regions and renumber densely.
        state.id_map.clear();
        state.id_map.resize(state.regions_grown, -1);
        let mut kept = 0i32;
        for (region, &count) in state.region_sizes.iter().enumerate() {
            if count >= self.config.min_set_size {
                state.id_map[region] = kept;
                kept += 1;
            }
        }
        if kept as usize != state.regions_grown {
            for id in &mut batch.set_id {
                if *id >= 0 {
                    *id = state.id_map[*id as usize];
                }
            }
        }

        Ok(kept as usize)
    }
}
