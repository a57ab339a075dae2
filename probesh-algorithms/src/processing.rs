//! High-level pipeline: statistics, clustering, set encoding.

use crate::{
    compute_statistics, encode_sets, occlusion_sh, static_sh, FillingClustering, FillingConfig,
    KMeansClustering, KMeansConfig, SampleMetric,
};
use log::{info, warn};
use probesh_core::{EncodedProbe, EncoderConfig, Error, ProbeStatistics, Result, SampleBatch};

/// Set segmentation method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClusteringMethod {
    /// Weighted k-means over all geometry samples.
    KMeans,
    /// Region growing over adjacent texels.
    Filling,
}

/// Method-specific parameters not carried by [`EncoderConfig`].
#[derive(Clone, Debug)]
pub struct AlgorithmParams {
    /// k-means iteration cap.
    pub max_iterations: usize,
    /// k-means seeding RNG seed.
    pub seed: u64,
    /// Filling tolerance between adjacent samples.
    pub fill_tolerance: f32,
    /// Filling regions below this size are dropped.
    pub min_set_size: usize,
}

impl Default for AlgorithmParams {
    fn default() -> Self {
        Self {
            max_iterations: 64,
            seed: 0,
            fill_tolerance: 0.1,
            min_set_size: 1,
        }
    }
}

impl AlgorithmParams {
    /// Checks that the parameters leave room for at least one clustering step.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] naming the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::ConfigError(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !self.fill_tolerance.is_finite() || self.fill_tolerance < 0.0 {
            return Err(Error::ConfigError(format!(
                "fill_tolerance = {} must be a non-negative number",
                self.fill_tolerance
            )));
        }
        Ok(())
    }
}

/// Clusters the batch in place with the selected method.
///
/// Returns the number of sets written to `batch.set_id`.
///
/// # Errors
/// Returns an error if the clustering algorithm rejects the batch.
pub fn cluster_batch(
    batch: &mut SampleBatch,
    method: ClusteringMethod,
    config: &EncoderConfig,
    params: &AlgorithmParams,
    statistics: &ProbeStatistics,
) -> Result<usize> {
    let metric = SampleMetric::new(config, statistics.mean_distance);
    let num_sets = match method {
        ClusteringMethod::KMeans => {
            let algo = KMeansClustering::new(KMeansConfig {
                k: config.k,
                max_iterations: params.max_iterations,
                seed: params.seed,
            });
            let mut state = algo.create_state();
            let n = algo.cluster(batch, &metric, &mut state)?;
            info!(
                "k-means: {n} sets after {} iterations (converged: {})",
                state.iterations, state.converged
            );
            n
        }
        ClusteringMethod::Filling => {
            let algo = FillingClustering::new(FillingConfig {
                tolerance: params.fill_tolerance,
                min_set_size: params.min_set_size,
            });
            let mut state = algo.create_state();
            let n = algo.cluster(batch, &metric, &mut state)?;
            info!(
                "filling: {n} sets kept out of {} regions",
                state.regions_grown
            );
            n
        }
    };
    Ok(num_sets)
}

/// Runs the whole encoding pipeline on one capture.
///
/// # Errors
/// Returns an error if the configuration is invalid or clustering fails.
pub fn encode_probe(
    batch: &mut SampleBatch,
    method: ClusteringMethod,
    config: &EncoderConfig,
    params: &AlgorithmParams,
) -> Result<EncodedProbe> {
    config.validate()?;
    params.validate()?;

    let statistics = compute_statistics(batch);
    info!(
        "probe at {:?}: {} geometry samples, {} sky samples, mean distance {:.3}",
        batch.probe_position,
        statistics.geometry_samples,
        statistics.sky_samples,
        statistics.mean_distance
    );

    let mut probe = EncodedProbe::new(batch.probe_position, statistics);
    probe.sh_occlusion = occlusion_sh(batch);
    probe.sh_static = static_sh(batch);

    if statistics.geometry_samples == 0 {
        warn!("capture only sees sky, no sets encoded");
        batch.reset_sets();
        return Ok(probe);
    }

    let num_sets = cluster_batch(batch, method, config, params, &statistics)?;
    probe.sets = encode_sets(batch, num_sets, config.light_samples)?;
    info!(
        "encoded {} sets with {} light samples",
        probe.sets.len(),
        probe.light_sample_count()
    );
    Ok(probe)
}
