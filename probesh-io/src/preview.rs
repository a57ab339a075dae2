//! Cube-cross previews of a capture and its encoded sets.
//!
//! The six faces are laid out as a horizontal cross, 4 faces wide and 3
//! faces tall:
//!
//! ```text
//!        +Y
//!   -X   +Z   +X   -Z
//!        -Y
//! ```
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use crate::Result;
use glam::Vec3;
use image::{Rgb, RgbImage};
use probesh_core::cube::{CubeFace, Texel};
use probesh_core::{EncodedProbe, SampleBatch};
use std::path::Path;

/// What a preview texel shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Surface albedo.
    #[default]
    Albedo,
    /// Distance to the probe, normalised by the largest distance.
    Distance,
    /// World normal mapped to `[0, 1]`.
    Normal,
    /// Set id as a grey ramp.
    SetIndex,
    /// Average albedo of the owning set.
    SetColor,
    /// Distance from the sample to its set's average position.
    SetDistance,
    /// Average normal of the owning set.
    SetNormal,
    /// One colour per set, light sample texels in white.
    SetSamples,
    /// Combined SH radiance in the texel direction.
    Sh,
}

/// Preview options.
#[derive(Clone, Copy, Debug, Default)]
pub struct PreviewOptions {
    /// Displayed quantity.
    pub mode: ViewMode,
    /// Only show the texels of this set; everything else is black.
    pub isolate_set: Option<usize>,
    /// Albedo/Distance/Normal show the owning set's average instead of the
    /// raw sample.
    pub set_average: bool,
}

const SKY: Rgb<u8> = Rgb([0, 0, 0]);

/// Grid cell (column, row) of each face in the cross.
fn face_cell(face: CubeFace) -> (u32, u32) {
    match face {
        CubeFace::PosY => (1, 0),
        CubeFace::NegX => (0, 1),
        CubeFace::PosZ => (1, 1),
        CubeFace::PosX => (2, 1),
        CubeFace::NegZ => (3, 1),
        CubeFace::NegY => (1, 2),
    }
}

fn to_rgb(color: Vec3) -> Rgb<u8> {
    let c = color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
    Rgb([c.x.round() as u8, c.y.round() as u8, c.z.round() as u8])
}

/// Distinct colour per set (golden-ratio hue walk).
fn palette(set: usize) -> Vec3 {
    let hue = (set as f32 * 0.618_034).fract() * 6.0;
    let x = 1.0 - (hue % 2.0 - 1.0).abs();
    let (r, g, b) = match hue as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    Vec3::new(r, g, b) * 0.8 + Vec3::splat(0.1)
}

fn texel_color(
    batch: &SampleBatch,
    probe: &EncodedProbe,
    options: &PreviewOptions,
    index: usize,
    max_distance: f32,
    light_texels: &[bool],
) -> Rgb<u8> {
    if batch.is_sky(index) && options.mode != ViewMode::Sh {
        return SKY;
    }
    let set_id = usize::try_from(batch.set_id[index]).ok();
    if let Some(isolated) = options.isolate_set {
        if set_id != Some(isolated) {
            return SKY;
        }
    }
    let set = set_id.and_then(|id| probe.sets.get(id));
    let average = if options.set_average { set } else { None };

    let color = match options.mode {
        ViewMode::Albedo => average.map_or(batch.albedo[index], |s| s.albedo),
        ViewMode::Distance => {
            let d = average.map_or(batch.distance[index], |s| s.distance_to(probe.position));
            Vec3::splat(d / max_distance)
        }
        ViewMode::Normal => {
            let n = average.map_or(batch.normal[index], |s| s.normal);
            n * 0.5 + 0.5
        }
        ViewMode::SetIndex => match set_id {
            Some(id) if probe.sets.len() > 1 => {
                Vec3::splat(id as f32 / (probe.sets.len() - 1) as f32)
            }
            Some(_) => Vec3::ONE,
            None => return SKY,
        },
        ViewMode::SetColor => match set {
            Some(s) => s.albedo,
            None => return SKY,
        },
        ViewMode::SetDistance => match set {
            Some(s) => Vec3::splat(s.distance_to(batch.position[index]) / max_distance),
            None => return SKY,
        },
        ViewMode::SetNormal => match set {
            Some(s) => s.normal * 0.5 + 0.5,
            None => return SKY,
        },
        ViewMode::SetSamples => match set_id {
            _ if light_texels[index] => Vec3::ONE,
            Some(id) => palette(id) * 0.6,
            None => return SKY,
        },
        ViewMode::Sh => probe.combined_sh().evaluate(batch.direction[index]),
    };
    to_rgb(color)
}

/// Renders the capture as a cube cross.
///
/// `batch.set_id` must refer to `probe.sets`, as left by set encoding.
#[must_use]
pub fn render_cube_cross(
    batch: &SampleBatch,
    probe: &EncodedProbe,
    options: &PreviewOptions,
) -> RgbImage {
    let size = batch.face_size;
    let mut image = RgbImage::from_pixel(4 * size, 3 * size, SKY);

    let max_distance = (0..batch.len())
        .filter(|&i| !batch.is_sky(i))
        .map(|i| batch.distance[i])
        .fold(0.0f32, f32::max)
        .max(f32::EPSILON);

    let mut light_texels = vec![false; batch.len()];
    for sample in probe.sets.iter().flat_map(|s| &s.light_samples) {
        if let Some(flag) = light_texels.get_mut(sample.source) {
            *flag = true;
        }
    }

    for index in 0..batch.len() {
        let Ok(texel) = Texel::from_index(size, index) else {
            continue;
        };
        let (col, row) = face_cell(texel.face);
        let color = texel_color(batch, probe, options, index, max_distance, &light_texels);
        image.put_pixel(col * size + texel.x, row * size + texel.y, color);
    }
    image
}

/// Renders and saves a PNG preview.
///
/// # Errors
/// Returns an error if the image cannot be encoded or written.
pub fn save_preview<P: AsRef<Path>>(
    path: P,
    batch: &SampleBatch,
    probe: &EncodedProbe,
    options: &PreviewOptions,
) -> Result<()> {
    render_cube_cross(batch, probe, options).save(path)?;
    Ok(())
}
