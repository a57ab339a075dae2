//! Cube-map texel geometry.
//!
//! Faces follow the D3D convention (+X, -X, +Y, -Y, +Z, -Z). Texels are
//! addressed either as a [`Texel`] or as a flat index
//! `face * size² + y * size + x`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use glam::Vec3;

/// Number of faces of a cube map.
pub const FACE_COUNT: usize = 6;

/// One face of a cube map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CubeFace {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl CubeFace {
    /// All faces in storage order.
    pub const ALL: [CubeFace; FACE_COUNT] = [
        CubeFace::PosX,
        CubeFace::NegX,
        CubeFace::PosY,
        CubeFace::NegY,
        CubeFace::PosZ,
        CubeFace::NegZ,
    ];

    /// Storage index of the face.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Face from its storage index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Unnormalized direction through face coordinates `u, v` in `[-1, 1]`.
    ///
    /// Coordinates outside that range point into the adjacent faces, which
    /// is what the neighbour lookup relies on.
    #[must_use]
    pub fn direction(self, u: f32, v: f32) -> Vec3 {
        match self {
            CubeFace::PosX => Vec3::new(1.0, -v, -u),
            CubeFace::NegX => Vec3::new(-1.0, -v, u),
            CubeFace::PosY => Vec3::new(u, 1.0, v),
            CubeFace::NegY => Vec3::new(u, -1.0, -v),
            CubeFace::PosZ => Vec3::new(u, -v, 1.0),
            CubeFace::NegZ => Vec3::new(-u, -v, -1.0),
        }
    }
}

/// A texel of a cube map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Texel {
    /// Cube face.
    pub face: CubeFace,
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl Texel {
    /// Creates a new texel.
    #[inline]
    #[must_use]
    pub fn new(face: CubeFace, x: u32, y: u32) -> Self {
        Self { face, x, y }
    }

    /// Flat storage index for a cube map of the given face size.
    #[inline]
    #[must_use]
    pub fn index(&self, size: u32) -> usize {
        let size = size as usize;
        self.face.index() * size * size + self.y as usize * size + self.x as usize
    }

    /// Texel from its flat storage index.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTexel`] if the index is past the last face.
    pub fn from_index(size: u32, index: usize) -> Result<Self> {
        let side = size as usize;
        let per_face = side * side;
        let face_index = if per_face == 0 { FACE_COUNT } else { index / per_face };
        let face = CubeFace::from_index(face_index).ok_or(Error::InvalidTexel {
            face: u8::try_from(face_index).unwrap_or(u8::MAX),
            x: 0,
            y: 0,
            size,
        })?;
        let local = index - face_index * per_face;
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self {
            face,
            x: (local % side) as u32,
            y: (local / side) as u32,
        })
    }
}

#[allow(clippy::cast_precision_loss)]
#[inline]
fn texel_coord(coord: f32, size: u32) -> f32 {
    2.0 * (coord + 0.5) / size as f32 - 1.0
}

/// Unit direction through the centre of a texel.
#[must_use]
pub fn texel_direction(size: u32, texel: Texel) -> Vec3 {
    #[allow(clippy::cast_precision_loss)]
    let (u, v) = (
        texel_coord(texel.x as f32, size),
        texel_coord(texel.y as f32, size),
    );
    texel.face.direction(u, v).normalize()
}

/// Texel hit by a direction. The direction does not need to be normalized.
#[must_use]
pub fn direction_to_texel(size: u32, dir: Vec3) -> Texel {
    let abs = dir.abs();
    let (face, u, v) = if abs.x >= abs.y && abs.x >= abs.z {
        if dir.x > 0.0 {
            (CubeFace::PosX, -dir.z / abs.x, -dir.y / abs.x)
        } else {
            (CubeFace::NegX, dir.z / abs.x, -dir.y / abs.x)
        }
    } else if abs.y >= abs.z {
        if dir.y > 0.0 {
            (CubeFace::PosY, dir.x / abs.y, dir.z / abs.y)
        } else {
            (CubeFace::NegY, dir.x / abs.y, -dir.z / abs.y)
        }
    } else if dir.z > 0.0 {
        (CubeFace::PosZ, dir.x / abs.z, -dir.y / abs.z)
    } else {
        (CubeFace::NegZ, -dir.x / abs.z, -dir.y / abs.z)
    };

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let to_pixel = |c: f32| -> u32 {
        let p = ((c + 1.0) * 0.5 * size as f32).floor();
        (p.max(0.0) as u32).min(size.saturating_sub(1))
    };
    Texel::new(face, to_pixel(u), to_pixel(v))
}

fn area_element(x: f64, y: f64) -> f64 {
    (x * y).atan2((x * x + y * y + 1.0).sqrt())
}

/// Exact solid angle subtended by a texel (steradians).
#[must_use]
pub fn texel_solid_angle(size: u32, x: u32, y: u32) -> f32 {
    let inv = 1.0 / f64::from(size);
    let x0 = 2.0 * f64::from(x) * inv - 1.0;
    let y0 = 2.0 * f64::from(y) * inv - 1.0;
    let x1 = x0 + 2.0 * inv;
    let y1 = y0 + 2.0 * inv;
    #[allow(clippy::cast_possible_truncation)]
    let angle = (area_element(x0, y0) - area_element(x0, y1) - area_element(x1, y0)
        + area_element(x1, y1)) as f32;
    angle
}

/// The four edge neighbours of a texel, wrapping across faces.
///
/// Order: left, right, up, down (in face-local coordinates).
#[must_use]
pub fn texel_neighbors(size: u32, texel: Texel) -> [Texel; 4] {
    const OFFSETS: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
    let side = i64::from(size);
    OFFSETS.map(|(dx, dy)| {
        let nx = i64::from(texel.x) + dx;
        let ny = i64::from(texel.y) + dy;
        if (0..side).contains(&nx) && (0..side).contains(&ny) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            return Texel::new(texel.face, nx as u32, ny as u32);
        }
        #[allow(clippy::cast_precision_loss)]
        let dir = texel
            .face
            .direction(texel_coord(nx as f32, size), texel_coord(ny as f32, size));
        direction_to_texel(size, dir)
    })
}
