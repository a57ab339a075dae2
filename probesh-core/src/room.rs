//! Synthetic box-room captures.
//!
//! Renders an axis-aligned room into a [`SampleBatch`] the same way a
//! probe capture would: one ray per texel, first wall hit wins.

use crate::cube::{texel_direction, Texel, FACE_COUNT};
use crate::sample::{Sample, SampleBatch};
use glam::Vec3;

/// Far distance written into synthetic captures.
pub const ROOM_FAR_DISTANCE: f32 = 1000.0;

/// Point light used to fill the static lighting column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// Light position, inside the room.
    pub position: Vec3,
    /// Radiant intensity (RGB).
    pub intensity: Vec3,
}

/// Axis-aligned room with one albedo per wall.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxRoom {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
    /// Albedo of the walls facing +X, -X, +Y, -Y, +Z, -Z directions
    /// (the wall at `max.x` is index 0).
    pub wall_albedo: [Vec3; FACE_COUNT],
    /// The `max.y` wall is missing and shows sky.
    pub open_ceiling: bool,
    /// Static light.
    pub light: Option<PointLight>,
}

impl Default for BoxRoom {
    fn default() -> Self {
        Self {
            min: Vec3::new(-4.0, 0.0, -3.0),
            max: Vec3::new(4.0, 3.0, 3.0),
            wall_albedo: [
                Vec3::new(0.8, 0.1, 0.1),
                Vec3::new(0.1, 0.8, 0.1),
                Vec3::new(0.9, 0.9, 0.9),
                Vec3::new(0.4, 0.3, 0.2),
                Vec3::new(0.1, 0.1, 0.8),
                Vec3::new(0.8, 0.8, 0.1),
            ],
            open_ceiling: false,
            light: None,
        }
    }
}

impl BoxRoom {
    /// Removes or restores the ceiling.
    #[must_use]
    pub fn with_open_ceiling(mut self, open: bool) -> Self {
        self.open_ceiling = open;
        self
    }

    /// Adds a static point light.
    #[must_use]
    pub fn with_light(mut self, position: Vec3, intensity: Vec3) -> Self {
        self.light = Some(PointLight {
            position,
            intensity,
        });
        self
    }

    /// Room centre.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Captures the room from `probe` into a full cube map.
    #[must_use]
    pub fn capture(&self, probe: Vec3, face_size: u32) -> SampleBatch {
        let mut batch = SampleBatch::new(face_size, probe, ROOM_FAR_DISTANCE);
        for index in 0..SampleBatch::texel_count(face_size) {
            let sample = match Texel::from_index(face_size, index) {
                Ok(texel) => self.trace(probe, texel_direction(face_size, texel)),
                Err(_) => Sample::sky(),
            };
            batch.push(&sample);
        }
        batch
    }

    /// Traces one ray from inside the room.
    fn trace(&self, origin: Vec3, dir: Vec3) -> Sample {
        let mut best_t = f32::INFINITY;
        let mut best_wall = 0;
        for axis in 0..3 {
            let d = dir[axis];
            if d.abs() < 1e-8 {
                continue;
            }
            let (bound, wall) = if d > 0.0 {
                (self.max[axis], axis * 2)
            } else {
                (self.min[axis], axis * 2 + 1)
            };
            let t = (bound - origin[axis]) / d;
            if t >= 0.0 && t < best_t {
                best_t = t;
                best_wall = wall;
            }
        }

        if !best_t.is_finite() || (self.open_ceiling && best_wall == 2) {
            return Sample::sky();
        }

        let position = origin + dir * best_t;
        let mut normal = Vec3::ZERO;
        normal[best_wall / 2] = if best_wall % 2 == 0 { -1.0 } else { 1.0 };
        let albedo = self.wall_albedo[best_wall];

        let static_lit = self.light.map_or(Vec3::ZERO, |light| {
            let to_light = light.position - position;
            let dist_sq = to_light.length_squared().max(1e-4);
            let cosine = normal.dot(to_light.normalize_or_zero()).max(0.0);
            light.intensity * (cosine / dist_sq)
        });

        Sample {
            position,
            normal,
            albedo,
            static_lit,
            distance: best_t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_room_has_no_sky() {
        let room = BoxRoom::default();
        let batch = room.capture(room.center(), 8);
        assert!(batch.is_complete());
        assert_eq!(batch.geometry_indices().len(), batch.len());
    }

    #[test]
    fn test_open_ceiling_shows_sky_upwards() {
        let room = BoxRoom::default().with_open_ceiling(true);
        let batch = room.capture(room.center(), 8);
        let sky: Vec<usize> = (0..batch.len()).filter(|&i| batch.is_sky(i)).collect();
        assert!(!sky.is_empty());
        for i in sky {
            assert!(batch.direction[i].y > 0.0);
        }
    }

    #[test]
    fn test_samples_lie_on_walls() {
        let room = BoxRoom::default();
        let probe = Vec3::new(1.0, 1.5, -0.5);
        let batch = room.capture(probe, 8);
        for i in 0..batch.len() {
            let p = batch.position[i];
            let on_wall = (0..3).any(|axis| {
                (p[axis] - room.min[axis]).abs() < 1e-3 || (p[axis] - room.max[axis]).abs() < 1e-3
            });
            assert!(on_wall, "sample {i} at {p:?} is not on a wall");
            assert!((p.distance(probe) - batch.distance[i]).abs() < 1e-3);
            // Normals face the probe.
            assert!(batch.normal[i].dot(batch.direction[i]) < 0.0);
        }
    }

    #[test]
    fn test_static_light_fills_irradiance() {
        let room = BoxRoom::default().with_light(Vec3::new(0.0, 2.5, 0.0), Vec3::splat(10.0));
        let batch = room.capture(room.center(), 4);
        assert!(batch.static_lit.iter().any(|l| l.x > 0.0));
    }
}
