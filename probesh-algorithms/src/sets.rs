//! Encoding of clustered samples into probe sets.
//!
//! For each set:
//! 1. Area-weighted position, normal and albedo
//! 2. Principal axes of the samples in the set's tangent plane
//! 3. SH9 response `Σ ρ/π · Y(ω) · dω` (radiance seen by the probe for a
//!    unit irradiance arriving on the set)
//! 4. Light samples by farthest-point sampling, each a disc of equal area
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use glam::{DVec3, Vec3};
use probesh_core::sh::{sh_basis, ShRgb};
use probesh_core::{Error, LightSample, ProbeSet, Result, SampleBatch};
use rayon::prelude::*;
use std::f32::consts::PI;

/// Encodes every set referenced by `batch.set_id`.
///
/// Sets are returned by descending solid angle and `batch.set_id` is
/// relabelled so that set `i` of the result owns the samples labelled `i`.
///
/// # Errors
/// Returns [`Error::EmptySet`] if a set id below `num_sets` has no sample.
pub fn encode_sets(
    batch: &mut SampleBatch,
    num_sets: usize,
    light_samples: usize,
) -> Result<Vec<ProbeSet>> {
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); num_sets];
    for (i, &id) in batch.set_id.iter().enumerate() {
        if id >= 0 && (id as usize) < num_sets {
            members[id as usize].push(i);
        }
    }
    if let Some(empty) = members.iter().position(Vec::is_empty) {
        return Err(Error::EmptySet(empty));
    }

    let view: &SampleBatch = batch;
    let mut sets: Vec<(usize, ProbeSet)> = members
        .par_iter()
        .enumerate()
        .map(|(id, indices)| (id, encode_set(view, indices, light_samples)))
        .collect();

    sets.sort_by(|a, b| b.1.solid_angle.total_cmp(&a.1.solid_angle));

    let mut id_map = vec![-1i32; num_sets];
    for (new_id, (old_id, _)) in sets.iter().enumerate() {
        id_map[*old_id] = new_id as i32;
    }
    for id in &mut batch.set_id {
        if *id >= 0 {
            *id = id_map.get(*id as usize).copied().unwrap_or(-1);
        }
    }

    Ok(sets.into_iter().map(|(_, set)| set).collect())
}

/// Encodes one set from the indices of its samples. `indices` must not be
/// empty.
#[must_use]
pub fn encode_set(batch: &SampleBatch, indices: &[usize], light_samples: usize) -> ProbeSet {
    let mut area = 0.0f64;
    let mut solid_angle = 0.0f64;
    let mut position = DVec3::ZERO;
    let mut normal = DVec3::ZERO;
    let mut albedo = DVec3::ZERO;
    let mut sh_bounce = ShRgb::ZERO;

    for &i in indices {
        let a = f64::from(batch.world_area(i));
        area += a;
        solid_angle += f64::from(batch.solid_angle[i]);
        position += batch.position[i].as_dvec3() * a;
        normal += batch.normal[i].as_dvec3() * a;
        albedo += batch.albedo[i].as_dvec3() * a;
        sh_bounce.add_weighted(
            &sh_basis(batch.direction[i]),
            batch.albedo[i] * (batch.solid_angle[i] / PI),
        );
    }

    let inv_area = if area > 0.0 { 1.0 / area } else { 0.0 };
    let position = (position * inv_area).as_vec3();
    let albedo = (albedo * inv_area).as_vec3();
    let normal = {
        let n = normal.as_vec3().normalize_or_zero();
        if n == Vec3::ZERO {
            // Opposite normals cancelled out: face the probe.
            (batch.probe_position - position).normalize_or_zero()
        } else {
            n
        }
    };

    let (tangent, bitangent) = principal_axes(batch, indices, position, normal, inv_area);
    let area = area as f32;

    ProbeSet {
        position,
        normal,
        tangent,
        bitangent,
        albedo,
        sh_bounce,
        solid_angle: solid_angle as f32,
        area,
        sample_count: indices.len(),
        light_samples: pick_light_samples(batch, indices, position, area, light_samples),
    }
}

/// Longest and shortest axes of the set in its tangent plane, scaled by the
/// standard deviation along them.
fn principal_axes(
    batch: &SampleBatch,
    indices: &[usize],
    center: Vec3,
    normal: Vec3,
    inv_area: f64,
) -> (Vec3, Vec3) {
    let (t0, b0) = if normal == Vec3::ZERO {
        (Vec3::X, Vec3::Y)
    } else {
        normal.any_orthonormal_pair()
    };

    let (mut cxx, mut cxy, mut cyy) = (0.0f64, 0.0f64, 0.0f64);
    for &i in indices {
        let a = f64::from(batch.world_area(i));
        let d = batch.position[i] - center;
        let x = f64::from(d.dot(t0));
        let y = f64::from(d.dot(b0));
        cxx += a * x * x;
        cxy += a * x * y;
        cyy += a * y * y;
    }
    cxx *= inv_area;
    cxy *= inv_area;
    cyy *= inv_area;

    let mean = 0.5 * (cxx + cyy);
    let half_diff = 0.5 * (cxx - cyy);
    let radius = (half_diff * half_diff + cxy * cxy).sqrt();
    let major = (mean + radius).max(0.0);
    let minor = (mean - radius).max(0.0);
    let angle = 0.5 * (2.0 * cxy).atan2(cxx - cyy);
    let (s, c) = (angle as f32).sin_cos();

    let major_axis = t0 * c + b0 * s;
    let minor_axis = b0 * c - t0 * s;
    (
        major_axis * major.sqrt() as f32,
        minor_axis * minor.sqrt() as f32,
    )
}

/// Farthest-point sampling over the set's positions, starting from the
/// sample closest to the set centre.
fn pick_light_samples(
    batch: &SampleBatch,
    indices: &[usize],
    center: Vec3,
    area: f32,
    count: usize,
) -> Vec<LightSample> {
    let count = count.min(indices.len());
    if count == 0 {
        return Vec::new();
    }
    let radius = (area / (count as f32 * PI)).sqrt();

    let first = indices
        .iter()
        .enumerate()
        .min_by(|(_, &a), (_, &b)| {
            batch.position[a]
                .distance_squared(center)
                .total_cmp(&batch.position[b].distance_squared(center))
        })
        .map_or(0, |(slot, _)| slot);

    let mut chosen = Vec::with_capacity(count);
    let mut nearest: Vec<f32> = vec![f32::INFINITY; indices.len()];
    let mut next = first;
    loop {
        let source = indices[next];
        chosen.push(LightSample {
            position: batch.position[source],
            normal: batch.normal[source],
            radius,
            source,
        });
        if chosen.len() == count {
            break;
        }
        let p = batch.position[source];
        for (slot, &i) in indices.iter().enumerate() {
            nearest[slot] = nearest[slot].min(batch.position[i].distance_squared(p));
        }
        next = nearest
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0, |(slot, _)| slot);
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use probesh_core::{BoxRoom, Sample};

    /// Labels every sample by the wall it lies on (index of its normal).
    fn label_by_wall(batch: &mut SampleBatch) {
        for i in 0..batch.len() {
            let n = batch.normal[i];
            let wall = if n.x < -0.5 {
                0
            } else if n.x > 0.5 {
                1
            } else if n.y < -0.5 {
                2
            } else if n.y > 0.5 {
                3
            } else if n.z < -0.5 {
                4
            } else {
                5
            };
            batch.set_id[i] = wall;
        }
    }

    #[test]
    fn test_walls_encode_to_room_geometry() {
        let room = BoxRoom::default();
        let mut batch = room.capture(room.center(), 16);
        label_by_wall(&mut batch);
        let sets = encode_sets(&mut batch, 6, 8).unwrap();
        assert_eq!(sets.len(), 6);

        for set in &sets {
            // Each set is planar: position on a wall, normal axis aligned.
            assert_relative_eq!(set.normal.length(), 1.0, epsilon = 1e-5);
            assert!(set.normal.abs().max_element() > 0.999);
            assert!(set.tangent.length() >= set.bitangent.length());
            assert!(set.tangent.dot(set.normal).abs() < 1e-3);
            assert_eq!(set.light_samples.len(), 8);
            assert!(set.light_samples.iter().all(|s| s.radius > 0.0));
        }

        // Sorted by solid angle and relabelled accordingly.
        for pair in sets.windows(2) {
            assert!(pair[0].solid_angle >= pair[1].solid_angle);
        }
        for (id, set) in sets.iter().enumerate() {
            let count = batch.set_id.iter().filter(|&&s| s == id as i32).count();
            assert_eq!(count, set.sample_count);
        }

        let total: f32 = sets.iter().map(|s| s.solid_angle).sum();
        assert_relative_eq!(total, 4.0 * PI, epsilon = 1e-2);
    }

    #[test]
    fn test_floor_area_and_albedo() {
        let room = BoxRoom::default();
        let mut batch = room.capture(room.center(), 32);
        label_by_wall(&mut batch);
        let sets = encode_sets(&mut batch, 6, 4).unwrap();
        let floor = sets
            .iter()
            .find(|s| s.normal.y > 0.5)
            .expect("floor set");
        // 8 x 6 floor.
        assert_relative_eq!(floor.area, 48.0, max_relative = 0.05);
        assert_relative_eq!(floor.albedo.x, room.wall_albedo[3].x, epsilon = 1e-4);
        assert_relative_eq!(floor.position.y, 0.0, epsilon = 1e-4);
        // Longest axis of an 8 x 6 floor runs along X.
        assert!(floor.tangent.x.abs() > floor.tangent.z.abs());
    }

    #[test]
    fn test_bounce_sh_faces_the_set() {
        let room = BoxRoom::default();
        let mut batch = room.capture(room.center(), 16);
        label_by_wall(&mut batch);
        let sets = encode_sets(&mut batch, 6, 1).unwrap();
        for set in &sets {
            let toward = (set.position - room.center()).normalize();
            let front = set.sh_bounce.evaluate(toward);
            let back = set.sh_bounce.evaluate(-toward);
            assert!(front.x > back.x);
        }
    }

    #[test]
    fn test_light_samples_capped_by_set_size() {
        let mut batch = SampleBatch::new(1, Vec3::ZERO, 10.0);
        for _ in 0..6 {
            batch.push(&Sample::new(Vec3::X, -Vec3::X, Vec3::ONE, 1.0));
        }
        batch.set_id.fill(0);
        batch.set_id[5] = -1;
        let sets = encode_sets(&mut batch, 1, 64).unwrap();
        assert_eq!(sets[0].sample_count, 5);
        assert_eq!(sets[0].light_samples.len(), 5);
    }

    #[test]
    fn test_empty_set_is_an_error() {
        let room = BoxRoom::default();
        let mut batch = room.capture(room.center(), 4);
        batch.set_id.fill(0);
        assert!(matches!(
            encode_sets(&mut batch, 2, 4),
            Err(Error::EmptySet(1))
        ));
    }

    #[test]
    fn test_farthest_point_samples_spread_out() {
        let room = BoxRoom::default();
        let mut batch = room.capture(room.center(), 16);
        label_by_wall(&mut batch);
        let sets = encode_sets(&mut batch, 6, 4).unwrap();
        for set in &sets {
            let samples = &set.light_samples;
            for (a, sa) in samples.iter().enumerate() {
                for sb in &samples[a + 1..] {
                    assert!(sa.position.distance(sb.position) > 0.1);
                }
            }
        }
    }
}
