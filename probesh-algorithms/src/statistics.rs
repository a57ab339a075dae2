//! Probe-level statistics and whole-capture SH projections.

use glam::Vec3;
use probesh_core::sh::{sh_basis, ShRgb, ShScalar, SH_COEFFS};
use probesh_core::{ProbeStatistics, SampleBatch};
use rayon::prelude::*;
use std::f32::consts::PI;

#[derive(Clone, Copy)]
struct DistanceAccumulator {
    count: usize,
    sky: usize,
    sum: f64,
    inverse_sum: f64,
    touching: usize,
    min: f32,
    max: f32,
    bbox_min: Vec3,
    bbox_max: Vec3,
}

impl Default for DistanceAccumulator {
    fn default() -> Self {
        Self {
            count: 0,
            sky: 0,
            sum: 0.0,
            inverse_sum: 0.0,
            touching: 0,
            min: f32::INFINITY,
            max: 0.0,
            bbox_min: Vec3::splat(f32::INFINITY),
            bbox_max: Vec3::splat(f32::NEG_INFINITY),
        }
    }
}

impl DistanceAccumulator {
    fn merge(self, other: Self) -> Self {
        Self {
            count: self.count + other.count,
            sky: self.sky + other.sky,
            sum: self.sum + other.sum,
            inverse_sum: self.inverse_sum + other.inverse_sum,
            touching: self.touching + other.touching,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
            bbox_min: self.bbox_min.min(other.bbox_min),
            bbox_max: self.bbox_max.max(other.bbox_max),
        }
    }
}

/// Distance statistics and bounds of the geometry a probe sees.
#[must_use]
pub fn compute_statistics(batch: &SampleBatch) -> ProbeStatistics {
    let acc = (0..batch.len())
        .into_par_iter()
        .fold(DistanceAccumulator::default, |mut acc, i| {
            if batch.is_sky(i) {
                acc.sky += 1;
                return acc;
            }
            let d = batch.distance[i];
            acc.count += 1;
            acc.sum += f64::from(d);
            if d > 0.0 {
                acc.inverse_sum += 1.0 / f64::from(d);
            } else {
                acc.touching += 1;
            }
            acc.min = acc.min.min(d);
            acc.max = acc.max.max(d);
            acc.bbox_min = acc.bbox_min.min(batch.position[i]);
            acc.bbox_max = acc.bbox_max.max(batch.position[i]);
            acc
        })
        .reduce(DistanceAccumulator::default, DistanceAccumulator::merge);

    if acc.count == 0 {
        return ProbeStatistics {
            sky_samples: acc.sky,
            ..ProbeStatistics::default()
        };
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    let (mean, harmonic) = {
        let n = acc.count as f64;
        // Geometry touching the probe drives Σ 1/d to infinity.
        let harmonic = if acc.touching == 0 && acc.inverse_sum > 0.0 {
            n / acc.inverse_sum
        } else {
            0.0
        };
        ((acc.sum / n) as f32, harmonic as f32)
    };

    ProbeStatistics {
        mean_distance: mean,
        mean_harmonic_distance: harmonic,
        min_distance: acc.min,
        max_distance: acc.max,
        bbox_min: acc.bbox_min,
        bbox_max: acc.bbox_max,
        geometry_samples: acc.count,
        sky_samples: acc.sky,
    }
}

/// Directional sky visibility: `Σ_sky Y(ω) dω`.
#[must_use]
pub fn occlusion_sh(batch: &SampleBatch) -> ShScalar {
    (0..batch.len())
        .into_par_iter()
        .filter(|&i| batch.is_sky(i))
        .fold(
            || [0.0f32; SH_COEFFS],
            |mut acc, i| {
                let basis = sh_basis(batch.direction[i]);
                let weight = batch.solid_angle[i];
                for (a, b) in acc.iter_mut().zip(basis.iter()) {
                    *a += b * weight;
                }
                acc
            },
        )
        .reduce(
            || [0.0f32; SH_COEFFS],
            |mut a, b| {
                for (x, y) in a.iter_mut().zip(b.iter()) {
                    *x += y;
                }
                a
            },
        )
}

/// Static lighting diffusely bounced toward the probe:
/// `Σ_geometry static_lit · ρ/π · Y(ω) dω`.
#[must_use]
pub fn static_sh(batch: &SampleBatch) -> ShRgb {
    (0..batch.len())
        .into_par_iter()
        .filter(|&i| !batch.is_sky(i))
        .fold(
            || ShRgb::ZERO,
            |mut acc, i| {
                let radiance = batch.static_lit[i] * batch.albedo[i] / PI;
                acc.add_weighted(
                    &sh_basis(batch.direction[i]),
                    radiance * batch.solid_angle[i],
                );
                acc
            },
        )
        .reduce(
            || ShRgb::ZERO,
            |mut a, b| {
                a.add(&b);
                a
            },
        )
}
