//! Weighted k-means clustering of capture samples into probe sets.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::unused_self
)]

use crate::metric::{Centroid, SampleMetric};
use glam::DVec3;
use log::{debug, warn};
use probesh_core::{ClusteringError, SampleBatch};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// K-means configuration.
#[derive(Clone, Debug)]
pub struct KMeansConfig {
    /// Number of clusters.
    pub k: usize,
    /// Iteration cap.
    pub max_iterations: usize,
    /// Seed of the k-means++ initialisation.
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 32,
            max_iterations: 64,
            seed: 0,
        }
    }
}

/// Reusable buffers and run statistics.
#[derive(Default)]
pub struct KMeansState {
    centroids: Vec<Centroid>,
    candidates: Vec<usize>,
    nearest: Vec<(usize, f32)>,
    seed_distances: Vec<f32>,
    sizes: Vec<usize>,
    /// Iterations performed by the last run.
    pub iterations: usize,
    /// Whether the last run stopped because no label changed.
    pub converged: bool,
}

impl KMeansState {
    /// Centroids of the last run, indexed by final set id.
    pub fn centroids(&self) -> &[Centroid] {
        &self.centroids
    }
}

/// K-means clustering with k-means++ seeding.
pub struct KMeansClustering {
    config: KMeansConfig,
}

impl KMeansClustering {
    pub fn new(config: KMeansConfig) -> Self {
        Self { config }
    }

    pub fn create_state(&self) -> KMeansState {
        KMeansState::default()
    }

    /// Writes set ids into `batch.set_id` and returns the number of sets.
    ///
    /// Sky samples keep -1. Set ids are dense: every id below the returned
    /// count owns at least one sample.
    pub fn cluster(
        &self,
        batch: &mut SampleBatch,
        metric: &SampleMetric,
        state: &mut KMeansState,
    ) -> Result<usize, ClusteringError> {
        if self.config.k == 0 {
            return Err(ClusteringError::InvalidK(0));
        }
        if self.config.max_iterations == 0 {
            return Err(ClusteringError::InvalidIterations(0));
        }
        if batch.set_id.len() != batch.len() {
            return Err(ClusteringError::LabelMismatch {
                samples: batch.len(),
                labels: batch.set_id.len(),
            });
        }

        batch.reset_sets();
        state.candidates = batch.geometry_indices();
        let n = state.candidates.len();
        if n == 0 {
            return Err(ClusteringError::NoGeometry);
        }

        let mut k = self.config.k;
        if k > n {
            warn!("k = {k} exceeds the {n} geometry samples, clamping");
            k = n;
        }

        self.seed_centroids(batch, metric, state, k);
        let k = state.centroids.len();

        state.iterations = 0;
        state.converged = false;
        state.sizes.clear();
        state.sizes.resize(k, 0);

        for iteration in 0..self.config.max_iterations {
            state.iterations = iteration + 1;

            // Assignment step.
            let centroids = &state.centroids;
            let view: &SampleBatch = batch;
            state.nearest = state
                .candidates
                .par_iter()
                .map(|&i| nearest_centroid(view, metric, i, centroids))
                .collect();

            let mut changed = 0usize;
            for (&i, &(label, _)) in state.candidates.iter().zip(state.nearest.iter()) {
                let label = label as i32;
                if batch.set_id[i] != label {
                    batch.set_id[i] = label;
                    changed += 1;
                }
            }

            // Update step.
            let reseeded = self.update_centroids(batch, state);
            debug!("k-means iteration {iteration}: {changed} changes, {reseeded} reseeded");

            if changed == 0 && reseeded == 0 {
                state.converged = true;
                break;
            }
        }

        Ok(compact_labels(batch, state))
    }

    fn seed_centroids(
        &self,
        batch: &SampleBatch,
        metric: &SampleMetric,
        state: &mut KMeansState,
        k: usize,
    ) {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let candidates = &state.candidates;

        let first = candidates[rng.gen_range(0..candidates.len())];
        state.centroids.clear();
        state.centroids.push(Centroid::from_sample(batch, first));

        let c0 = state.centroids[0];
        state.seed_distances = candidates
            .par_iter()
            .map(|&i| metric.distance(batch, i, &c0))
            .collect();

        while state.centroids.len() < k {
            let total: f64 = state.seed_distances.iter().map(|&d| f64::from(d)).sum();
            if total <= 0.0 {
                // Every remaining sample coincides with a centroid.
                break;
            }
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = None;
            for (slot, &d) in state.seed_distances.iter().enumerate() {
                target -= f64::from(d);
                if target <= 0.0 && d > 0.0 {
                    chosen = Some(slot);
                    break;
                }
            }
            // Rounding can exhaust the walk; fall back to the farthest sample.
            let chosen = chosen.unwrap_or_else(|| farthest_slot(&state.seed_distances));

            let centroid = Centroid::from_sample(batch, candidates[chosen]);
            state.centroids.push(centroid);
            state
                .seed_distances
                .par_iter_mut()
                .zip(candidates.par_iter())
                .for_each(|(d, &i)| *d = d.min(metric.distance(batch, i, &centroid)));
        }
    }

    /// Recomputes centroids from the current labels. Empty clusters are
    /// moved onto the samples farthest from their centroid; returns how many.
    fn update_centroids(&self, batch: &mut SampleBatch, state: &mut KMeansState) -> usize {
        let k = state.centroids.len();
        let mut positions = vec![DVec3::ZERO; k];
        let mut normals = vec![DVec3::ZERO; k];
        let mut albedos = vec![DVec3::ZERO; k];
        state.sizes.fill(0);

        for &i in &state.candidates {
            let label = batch.set_id[i] as usize;
            positions[label] += batch.position[i].as_dvec3();
            normals[label] += batch.normal[i].as_dvec3();
            albedos[label] += batch.albedo[i].as_dvec3();
            state.sizes[label] += 1;
        }

        for (label, centroid) in state.centroids.iter_mut().enumerate() {
            let count = state.sizes[label];
            if count == 0 {
                continue;
            }
            let inv = 1.0 / count as f64;
            centroid.position = (positions[label] * inv).as_vec3();
            centroid.albedo = (albedos[label] * inv).as_vec3();
            let normal = normals[label].as_vec3().normalize_or_zero();
            if normal != glam::Vec3::ZERO {
                centroid.normal = normal;
            }
        }

        let mut reseeded = 0;
        for label in 0..k {
            if state.sizes[label] > 0 {
                continue;
            }
            // Farthest sample from its own centroid, not the only member of
            // its cluster.
            let farthest = state
                .candidates
                .iter()
                .zip(state.nearest.iter())
                .filter(|(&i, _)| state.sizes[batch.set_id[i] as usize] > 1)
                .max_by(|(_, a), (_, b)| a.1.total_cmp(&b.1))
                .map(|(&i, _)| i);
            let Some(i) = farthest else {
                break;
            };
            let previous = batch.set_id[i] as usize;
            state.sizes[previous] -= 1;
            state.sizes[label] = 1;
            batch.set_id[i] = label as i32;
            state.centroids[label] = Centroid::from_sample(batch, i);
            if let Some(slot) = state.candidates.iter().position(|&c| c == i) {
                state.nearest[slot] = (label, 0.0);
            }
            reseeded += 1;
        }
        reseeded
    }
}

fn farthest_slot(distances: &[f32]) -> usize {
    distances
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map_or(0, |(slot, _)| slot)
}

fn nearest_centroid(
    batch: &SampleBatch,
    metric: &SampleMetric,
    index: usize,
    centroids: &[Centroid],
) -> (usize, f32) {
    let mut best = (0, f32::INFINITY);
    for (label, centroid) in centroids.iter().enumerate() {
        let d = metric.distance(batch, index, centroid);
        if d < best.1 {
            best = (label, d);
        }
    }
    best
}

/// Renumbers labels so that no id is empty. Returns the number of sets.
fn compact_labels(batch: &mut SampleBatch, state: &mut KMeansState) -> usize {
    let k = state.centroids.len();
    let mut sizes = vec![0usize; k];
    for &i in &state.candidates {
        sizes[batch.set_id[i] as usize] += 1;
    }

    let mut id_map = vec![-1i32; k];
    let mut next = 0i32;
    for (old, &size) in sizes.iter().enumerate() {
        if size > 0 {
            id_map[old] = next;
            next += 1;
        }
    }

    if next as usize != k {
        batch.set_id.par_iter_mut().for_each(|id| {
            if *id >= 0 {
                *id = id_map[*id as usize];
            }
        });
        let mut kept = Vec::with_capacity(next as usize);
        for (old, centroid) in state.centroids.iter().enumerate() {
            if id_map[old] >= 0 {
                kept.push(*centroid);
            }
        }
        state.centroids = kept;
    }
    next as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use probesh_core::{BoxRoom, EncoderConfig, Sample};

    fn metric() -> SampleMetric {
        SampleMetric::new(&EncoderConfig::default(), 4.0)
    }

    #[test]
    fn test_config_defaults() {
        let config = KMeansConfig::default();
        assert_eq!(config.k, 32);
        assert_eq!(config.max_iterations, 64);
    }

    #[test]
    fn test_zero_k_is_rejected() {
        let room = BoxRoom::default();
        let mut batch = room.capture(room.center(), 4);
        let algo = KMeansClustering::new(KMeansConfig {
            k: 0,
            ..KMeansConfig::default()
        });
        let mut state = algo.create_state();
        assert_eq!(
            algo.cluster(&mut batch, &metric(), &mut state),
            Err(ClusteringError::InvalidK(0))
        );
    }

    #[test]
    fn test_zero_iterations_is_rejected() {
        let room = BoxRoom::default();
        let mut batch = room.capture(room.center(), 4);
        let algo = KMeansClustering::new(KMeansConfig {
            k: 4,
            max_iterations: 0,
            seed: 0,
        });
        let mut state = algo.create_state();
        assert_eq!(
            algo.cluster(&mut batch, &metric(), &mut state),
            Err(ClusteringError::InvalidIterations(0))
        );
        assert!(batch.set_id.iter().all(|&id| id == -1));
    }

    #[test]
    fn test_single_iteration_assigns_every_sample() {
        let room = BoxRoom::default();
        let mut batch = room.capture(room.center(), 4);
        let algo = KMeansClustering::new(KMeansConfig {
            k: 4,
            max_iterations: 1,
            seed: 0,
        });
        let mut state = algo.create_state();
        let n = algo.cluster(&mut batch, &metric(), &mut state).unwrap();
        assert_eq!(state.iterations, 1);
        assert!(batch.set_id.iter().all(|&id| id >= 0 && (id as usize) < n));
    }

    #[test]
    fn test_sky_only_capture() {
        let mut batch = SampleBatch::new(2, Vec3::ZERO, 100.0);
        for _ in 0..24 {
            batch.push(&Sample::sky());
        }
        let algo = KMeansClustering::new(KMeansConfig::default());
        let mut state = algo.create_state();
        assert_eq!(
            algo.cluster(&mut batch, &metric(), &mut state),
            Err(ClusteringError::NoGeometry)
        );
    }

    #[test]
    fn test_k_is_clamped_to_sample_count() {
        let mut batch = SampleBatch::new(1, Vec3::ZERO, 100.0);
        batch.push(&Sample::new(Vec3::X, -Vec3::X, Vec3::ONE, 1.0));
        batch.push(&Sample::new(-Vec3::X, Vec3::X, Vec3::ZERO, 1.0));
        for _ in 0..4 {
            batch.push(&Sample::sky());
        }
        let algo = KMeansClustering::new(KMeansConfig {
            k: 16,
            ..KMeansConfig::default()
        });
        let mut state = algo.create_state();
        let n = algo.cluster(&mut batch, &metric(), &mut state).unwrap();
        assert_eq!(n, 2);
        assert_ne!(batch.set_id[0], batch.set_id[1]);
        assert!(batch.set_id[2..].iter().all(|&id| id == -1));
    }

    #[test]
    fn test_identical_samples_collapse() {
        let mut batch = SampleBatch::new(1, Vec3::ZERO, 100.0);
        for _ in 0..6 {
            batch.push(&Sample::new(Vec3::X, -Vec3::X, Vec3::ONE, 1.0));
        }
        let algo = KMeansClustering::new(KMeansConfig {
            k: 4,
            ..KMeansConfig::default()
        });
        let mut state = algo.create_state();
        let n = algo.cluster(&mut batch, &metric(), &mut state).unwrap();
        assert_eq!(n, 1);
        assert!(batch.set_id.iter().all(|&id| id == 0));
        assert!(state.converged);
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let room = BoxRoom::default();
        let mut a = room.capture(room.center(), 8);
        let mut b = a.clone();
        let algo = KMeansClustering::new(KMeansConfig {
            k: 8,
            seed: 7,
            ..KMeansConfig::default()
        });
        let mut state = algo.create_state();
        algo.cluster(&mut a, &metric(), &mut state).unwrap();
        algo.cluster(&mut b, &metric(), &mut state).unwrap();
        assert_eq!(a.set_id, b.set_id);
    }
}
