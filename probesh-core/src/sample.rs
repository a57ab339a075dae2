//! Structure of Arrays (`SoA`) storage for probe capture samples.
//!
//! A capture holds one sample per cube-map texel, in flat texel order, so
//! the sample index doubles as the texel index. Directions and solid angles
//! are derived from the texel position when a sample is pushed.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cube::{texel_direction, texel_solid_angle, Texel, FACE_COUNT};
use glam::Vec3;

/// Lower bound of `|n·ω|` when converting solid angle to world area.
const MIN_GRAZING_COSINE: f32 = 0.05;

/// A single capture sample: what the probe sees through one texel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sample {
    /// World position of the surface.
    pub position: Vec3,
    /// World normal of the surface.
    pub normal: Vec3,
    /// Diffuse albedo.
    pub albedo: Vec3,
    /// Static irradiance arriving at the surface.
    pub static_lit: Vec3,
    /// Distance from the probe. Non-finite for sky.
    pub distance: f32,
}

impl Sample {
    /// Creates a geometry sample without static lighting.
    #[must_use]
    pub fn new(position: Vec3, normal: Vec3, albedo: Vec3, distance: f32) -> Self {
        Self {
            position,
            normal,
            albedo,
            static_lit: Vec3::ZERO,
            distance,
        }
    }

    /// Creates a sky sample.
    #[must_use]
    pub fn sky() -> Self {
        Self {
            distance: f32::INFINITY,
            ..Self::default()
        }
    }
}

/// A full cube-map capture stored in Structure of Arrays (`SoA`) format.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SampleBatch {
    /// Resolution of one cube face.
    pub face_size: u32,
    /// Probe position.
    pub probe_position: Vec3,
    /// Distances at or beyond this are sky.
    pub far_distance: f32,
    /// Columnar storage for world positions.
    pub position: Vec<Vec3>,
    /// Columnar storage for world normals.
    pub normal: Vec<Vec3>,
    /// Columnar storage for albedos.
    pub albedo: Vec<Vec3>,
    /// Columnar storage for static irradiance.
    pub static_lit: Vec<Vec3>,
    /// Columnar storage for distances to the probe.
    pub distance: Vec<f32>,
    /// Unit direction from the probe through the texel (derived).
    pub direction: Vec<Vec3>,
    /// Texel solid angle (derived).
    pub solid_angle: Vec<f32>,
    /// Set assignments (output of clustering), -1 when unassigned.
    pub set_id: Vec<i32>,
}

impl SampleBatch {
    /// Creates an empty batch sized for a full cube map.
    #[must_use]
    pub fn new(face_size: u32, probe_position: Vec3, far_distance: f32) -> Self {
        let capacity = Self::texel_count(face_size);
        Self {
            face_size,
            probe_position,
            far_distance,
            position: Vec::with_capacity(capacity),
            normal: Vec::with_capacity(capacity),
            albedo: Vec::with_capacity(capacity),
            static_lit: Vec::with_capacity(capacity),
            distance: Vec::with_capacity(capacity),
            direction: Vec::with_capacity(capacity),
            solid_angle: Vec::with_capacity(capacity),
            set_id: Vec::with_capacity(capacity),
        }
    }

    /// Number of texels in a cube map of the given face size.
    ///
    /// Saturates at `usize::MAX` for face sizes whose texel count does not
    /// fit; use [`Self::checked_texel_count`] on untrusted sizes.
    #[must_use]
    pub fn texel_count(face_size: u32) -> usize {
        Self::checked_texel_count(face_size).unwrap_or(usize::MAX)
    }

    /// Number of texels in a cube map, or `None` on overflow.
    #[must_use]
    pub fn checked_texel_count(face_size: u32) -> Option<usize> {
        let side = usize::try_from(face_size).ok()?;
        side.checked_mul(side)?.checked_mul(FACE_COUNT)
    }

    /// Returns the number of samples in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.position.len()
    }

    /// Returns true if the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }

    /// Returns true once every texel of the cube map has a sample.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.len() == Self::texel_count(self.face_size)
    }

    /// Pushes the sample of the next texel.
    ///
    /// Pushing past the last texel is ignored and returns `false`.
    pub fn push(&mut self, sample: &Sample) -> bool {
        let Ok(texel) = Texel::from_index(self.face_size, self.len()) else {
            return false;
        };
        self.position.push(sample.position);
        self.normal.push(sample.normal);
        self.albedo.push(sample.albedo);
        self.static_lit.push(sample.static_lit);
        self.distance.push(sample.distance);
        self.direction.push(texel_direction(self.face_size, texel));
        self.solid_angle
            .push(texel_solid_angle(self.face_size, texel.x, texel.y));
        self.set_id.push(-1);
        true
    }

    /// Returns the sample at `index` as a struct.
    #[must_use]
    pub fn sample(&self, index: usize) -> Sample {
        Sample {
            position: self.position[index],
            normal: self.normal[index],
            albedo: self.albedo[index],
            static_lit: self.static_lit[index],
            distance: self.distance[index],
        }
    }

    /// Returns true if the sample sees no geometry.
    #[inline]
    #[must_use]
    pub fn is_sky(&self, index: usize) -> bool {
        let d = self.distance[index];
        !d.is_finite() || d >= self.far_distance
    }

    /// Indices of every sample that sees geometry.
    #[must_use]
    pub fn geometry_indices(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| !self.is_sky(i)).collect()
    }

    /// World-space area covered by a texel's sample.
    #[must_use]
    pub fn world_area(&self, index: usize) -> f32 {
        let d = self.distance[index];
        let cosine = self.normal[index]
            .dot(self.direction[index])
            .abs()
            .max(MIN_GRAZING_COSINE);
        self.solid_angle[index] * d * d / cosine
    }

    /// Marks every sample as unassigned.
    pub fn reset_sets(&mut self) {
        self.set_id.fill(-1);
    }

    /// Number of distinct sets referenced by `set_id` (highest id + 1).
    #[must_use]
    pub fn set_count(&self) -> usize {
        self.set_id
            .iter()
            .filter(|&&id| id >= 0)
            .max()
            .map_or(0, |&id| id as usize + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texel_count_overflow() {
        assert_eq!(SampleBatch::checked_texel_count(16), Some(6 * 16 * 16));
        assert_eq!(SampleBatch::checked_texel_count(0), Some(0));
        if usize::BITS == 64 {
            assert_eq!(
                SampleBatch::checked_texel_count(u32::MAX),
                (u32::MAX as usize)
                    .checked_mul(u32::MAX as usize)
                    .and_then(|n| n.checked_mul(6))
            );
            assert!(SampleBatch::checked_texel_count(0xF000_0000).is_none());
        }
        assert!(SampleBatch::texel_count(0xF000_0000) > 0);
    }

    #[test]
    fn test_sample_batch_operations() {
        let mut batch = SampleBatch::new(2, Vec3::ZERO, 100.0);
        assert!(batch.is_empty());
        assert!(!batch.is_complete());

        let wall = Sample::new(Vec3::new(1.0, 0.0, 0.0), -Vec3::X, Vec3::splat(0.5), 1.0);
        for _ in 0..23 {
            assert!(batch.push(&wall));
        }
        assert!(batch.push(&Sample::sky()));
        assert!(batch.is_complete());
        assert!(!batch.push(&wall));

        assert_eq!(batch.len(), 24);
        assert_eq!(batch.set_id[0], -1);
        assert!(!batch.is_sky(0));
        assert!(batch.is_sky(23));
        assert_eq!(batch.geometry_indices().len(), 23);
        assert_eq!(batch.sample(3), wall);
    }

    #[test]
    fn test_far_distance_is_sky() {
        let mut batch = SampleBatch::new(1, Vec3::ZERO, 10.0);
        batch.push(&Sample::new(Vec3::X * 12.0, -Vec3::X, Vec3::ONE, 12.0));
        assert!(batch.is_sky(0));
    }

    #[test]
    fn test_set_count() {
        let mut batch = SampleBatch::new(1, Vec3::ZERO, 10.0);
        for _ in 0..6 {
            batch.push(&Sample::sky());
        }
        assert_eq!(batch.set_count(), 0);
        batch.set_id[2] = 3;
        assert_eq!(batch.set_count(), 4);
        batch.reset_sets();
        assert_eq!(batch.set_count(), 0);
    }

    #[test]
    fn test_world_area_grows_with_distance() {
        let mut batch = SampleBatch::new(1, Vec3::ZERO, 100.0);
        // Face +X seen head-on at distance 1 and 2.
        batch.push(&Sample::new(Vec3::X, -Vec3::X, Vec3::ONE, 1.0));
        let near = batch.world_area(0);
        batch.distance[0] = 2.0;
        let far = batch.world_area(0);
        assert!((far / near - 4.0).abs() < 1e-4);
    }
}
