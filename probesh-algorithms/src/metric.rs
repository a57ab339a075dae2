//! Weighted distance between capture samples and set centroids.
//!
//! ```text
//! d = (1-λ) * (w_pos * |p - p_c|² / s² + w_norm * (1 - n·n_c))
//!   +   λ   * (w_albedo * |ρ - ρ_c|²)
//! ```
//!
//! `s` is a length scale (the probe's mean distance) that makes the
//! position term independent of scene units.

use glam::Vec3;
use probesh_core::{EncoderConfig, SampleBatch};

/// Representative of a set in feature space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Centroid {
    /// World position.
    pub position: Vec3,
    /// Unit normal.
    pub normal: Vec3,
    /// Albedo.
    pub albedo: Vec3,
}

impl Centroid {
    /// Centroid located exactly on a sample.
    #[must_use]
    pub fn from_sample(batch: &SampleBatch, index: usize) -> Self {
        Self {
            position: batch.position[index],
            normal: batch.normal[index],
            albedo: batch.albedo[index],
        }
    }
}

/// Weighted sample metric.
#[derive(Clone, Copy, Debug)]
pub struct SampleMetric {
    position: f32,
    normal: f32,
    albedo: f32,
}

impl SampleMetric {
    /// Builds the metric from the encoder weights and a length scale.
    #[must_use]
    pub fn new(config: &EncoderConfig, scale: f32) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            1.0
        };
        let geometric = 1.0 - config.lambda;
        Self {
            position: geometric * config.weight_position / (scale * scale),
            normal: geometric * config.weight_normal,
            albedo: config.lambda * config.weight_albedo,
        }
    }

    /// Distance between two feature points.
    #[inline]
    #[must_use]
    pub fn between(&self, a: &Centroid, b: &Centroid) -> f32 {
        self.position * a.position.distance_squared(b.position)
            + self.normal * (1.0 - a.normal.dot(b.normal))
            + self.albedo * a.albedo.distance_squared(b.albedo)
    }

    /// Distance from a sample of the batch to a centroid.
    #[inline]
    #[must_use]
    pub fn distance(&self, batch: &SampleBatch, index: usize, centroid: &Centroid) -> f32 {
        self.between(&Centroid::from_sample(batch, index), centroid)
    }

    /// Distance between two samples of the batch.
    #[inline]
    #[must_use]
    pub fn sample_distance(&self, batch: &SampleBatch, a: usize, b: usize) -> f32 {
        self.between(
            &Centroid::from_sample(batch, a),
            &Centroid::from_sample(batch, b),
        )
    }
}
