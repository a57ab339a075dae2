//! Encoded probe types.

use crate::sh::{ShRgb, ShScalar, SH_COEFFS};
use glam::Vec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Distance and extent statistics of everything a probe sees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProbeStatistics {
    /// Mean distance of all geometry samples.
    pub mean_distance: f32,
    /// Harmonic mean distance (`N / Σ 1/d`), 0 when any sample touches the
    /// probe.
    pub mean_harmonic_distance: f32,
    /// Distance to the closest geometry sample.
    pub min_distance: f32,
    /// Distance to the farthest geometry sample.
    pub max_distance: f32,
    /// Axis-aligned bounds of the geometry samples.
    pub bbox_min: Vec3,
    /// Axis-aligned bounds of the geometry samples.
    pub bbox_max: Vec3,
    /// Number of samples that hit geometry.
    pub geometry_samples: usize,
    /// Number of samples that see the sky.
    pub sky_samples: usize,
}

impl Default for ProbeStatistics {
    fn default() -> Self {
        Self {
            mean_distance: 0.0,
            mean_harmonic_distance: 0.0,
            min_distance: f32::INFINITY,
            max_distance: 0.0,
            bbox_min: Vec3::splat(f32::INFINITY),
            bbox_max: Vec3::splat(f32::NEG_INFINITY),
            geometry_samples: 0,
            sky_samples: 0,
        }
    }
}

/// Disc approximation of a piece of a set, used to gather its lighting.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LightSample {
    /// World position of the disc centre.
    pub position: Vec3,
    /// World normal of the disc.
    pub normal: Vec3,
    /// Disc radius.
    pub radius: f32,
    /// Texel the sample was taken from.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub source: usize,
}

/// A cluster of capture samples encoded for runtime relighting.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProbeSet {
    /// Average world position.
    pub position: Vec3,
    /// Average world normal.
    pub normal: Vec3,
    /// Longest principal axis, scaled by its standard deviation.
    pub tangent: Vec3,
    /// Shortest principal axis, scaled by its standard deviation.
    pub bitangent: Vec3,
    /// Average albedo.
    pub albedo: Vec3,
    /// Radiance response seen by the probe for a unit irradiance on the set.
    pub sh_bounce: ShRgb,
    /// Solid angle covered by the set, seen from the probe.
    pub solid_angle: f32,
    /// World area covered by the set.
    pub area: f32,
    /// Number of capture samples in the set.
    pub sample_count: usize,
    /// Light samples.
    pub light_samples: Vec<LightSample>,
}

impl ProbeSet {
    /// Mean distance of the set to a point.
    #[must_use]
    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.position.distance(point)
    }
}

/// Result of encoding one probe capture.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EncodedProbe {
    /// Probe position.
    pub position: Vec3,
    /// Probe statistics.
    pub statistics: ProbeStatistics,
    /// Directional visibility of the sky.
    pub sh_occlusion: ShScalar,
    /// Static lighting bounced by the whole capture.
    pub sh_static: ShRgb,
    /// Sets, sorted by descending solid angle.
    pub sets: Vec<ProbeSet>,
}

impl EncodedProbe {
    /// Creates an encoded probe without sets.
    #[must_use]
    pub fn new(position: Vec3, statistics: ProbeStatistics) -> Self {
        Self {
            position,
            statistics,
            sh_occlusion: [0.0; SH_COEFFS],
            sh_static: ShRgb::ZERO,
            sets: Vec::new(),
        }
    }

    /// Static SH plus every set's bounce, assuming unit irradiance on sets.
    #[must_use]
    pub fn combined_sh(&self) -> ShRgb {
        let mut total = self.sh_static;
        for set in &self.sets {
            total.add(&set.sh_bounce);
        }
        total
    }

    /// Total number of light samples across sets.
    #[must_use]
    pub fn light_sample_count(&self) -> usize {
        self.sets.iter().map(|s| s.light_samples.len()).sum()
    }
}
