//! Order-2 real spherical harmonics (9 coefficients).
//!
//! Coefficient ordering is the usual `l, m` one:
//! `Y00, Y1-1, Y10, Y11, Y2-2, Y2-1, Y20, Y21, Y22`.
//!
//! Lobes (cosine, cone, smooth cone) are expressed as zonal harmonics
//! around +Z and rotated onto the requested direction.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use glam::Vec3;
use std::f32::consts::PI;

/// Number of SH coefficients for order 2.
pub const SH_COEFFS: usize = 9;

/// Scalar SH coefficients.
pub type ShScalar = [f32; SH_COEFFS];

const Y0: f32 = 0.282_094_8;
const Y1: f32 = 0.488_602_5;
const Y2: f32 = 1.092_548_4;
const Y20: f32 = 0.315_391_57;
const Y22: f32 = 0.546_274_2;

/// SH basis functions evaluated in a (unit) direction.
#[must_use]
pub fn sh_basis(dir: Vec3) -> ShScalar {
    let Vec3 { x, y, z } = dir;
    [
        Y0,
        Y1 * y,
        Y1 * z,
        Y1 * x,
        Y2 * x * y,
        Y2 * y * z,
        Y20 * (3.0 * z * z - 1.0),
        Y2 * x * z,
        Y22 * (x * x - y * y),
    ]
}

/// Band index of each coefficient.
const BAND: [usize; SH_COEFFS] = [0, 1, 1, 1, 2, 2, 2, 2, 2];

/// Rotates zonal harmonics (one coefficient per band, axis +Z) onto `dir`.
#[must_use]
pub fn zh_rotate(dir: Vec3, zh: [f32; 3]) -> ShScalar {
    let basis = sh_basis(dir);
    let scale = [
        (4.0 * PI).sqrt(),
        (4.0 * PI / 3.0).sqrt(),
        (4.0 * PI / 5.0).sqrt(),
    ];
    let mut coeffs = [0.0; SH_COEFFS];
    for (i, c) in coeffs.iter_mut().enumerate() {
        let band = BAND[i];
        *c = zh[band] * scale[band] * basis[i];
    }
    coeffs
}

/// Clamped cosine lobe `max(0, n·ω)` oriented along `dir`.
#[must_use]
pub fn cosine_lobe(dir: Vec3) -> ShScalar {
    zh_rotate(
        dir,
        [PI.sqrt() / 2.0, (PI / 3.0).sqrt(), (5.0 * PI).sqrt() / 8.0],
    )
}

/// Constant cone of the given half angle (radians) oriented along `dir`.
#[must_use]
pub fn cone(dir: Vec3, half_angle: f32) -> ShScalar {
    let (s, c) = half_angle.sin_cos();
    zh_rotate(
        dir,
        [
            PI.sqrt() * (1.0 - c),
            (3.0 * PI).sqrt() / 2.0 * s * s,
            (5.0 * PI).sqrt() / 2.0 * c * s * s,
        ],
    )
}

/// Cone whose intensity falls off linearly in `cos θ`, reaching zero at the
/// half angle. A half angle of π/2 gives the cosine lobe.
#[must_use]
pub fn smooth_cone(dir: Vec3, half_angle: f32) -> ShScalar {
    let c = half_angle.cos();
    zh_rotate(
        dir,
        [
            PI.sqrt() * (1.0 - c) / 2.0,
            (3.0 * PI).sqrt() * (1.0 - c) * (2.0 + c) / 6.0,
            (5.0 * PI).sqrt() * (1.0 - c) * (1.0 + c) * (1.0 + c) / 8.0,
        ],
    )
}

/// Evaluates scalar SH coefficients in a direction.
#[must_use]
pub fn evaluate(coeffs: &ShScalar, dir: Vec3) -> f32 {
    sh_basis(dir)
        .iter()
        .zip(coeffs.iter())
        .map(|(b, c)| b * c)
        .sum()
}

/// Nine RGB SH coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShRgb {
    /// Coefficients, one RGB triple per basis function.
    pub coeffs: [Vec3; SH_COEFFS],
}

impl ShRgb {
    /// All coefficients zero.
    pub const ZERO: Self = Self {
        coeffs: [Vec3::ZERO; SH_COEFFS],
    };

    /// Accumulates `color * basis` into the coefficients.
    pub fn add_weighted(&mut self, basis: &ShScalar, color: Vec3) {
        for (c, b) in self.coeffs.iter_mut().zip(basis.iter()) {
            *c += color * *b;
        }
    }

    /// Adds another set of coefficients.
    pub fn add(&mut self, other: &ShRgb) {
        for (c, o) in self.coeffs.iter_mut().zip(other.coeffs.iter()) {
            *c += *o;
        }
    }

    /// Scales every coefficient.
    #[must_use]
    pub fn scale(mut self, factor: f32) -> Self {
        for c in &mut self.coeffs {
            *c *= factor;
        }
        self
    }

    /// Evaluates the RGB function in a direction.
    #[must_use]
    pub fn evaluate(&self, dir: Vec3) -> Vec3 {
        sh_basis(dir)
            .iter()
            .zip(self.coeffs.iter())
            .fold(Vec3::ZERO, |acc, (b, c)| acc + *c * *b)
    }
}
