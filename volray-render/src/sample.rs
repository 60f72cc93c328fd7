//! Interpolated lookups in volumes addressed by local cube coordinates.

use volray::gradient::GradientVector;
use volray::math::{FreePoint, Vol};
use volray::resource::{DensityTexture, GradientSample, GradientTexture};

use crate::Interpolation;

/// Values that can be interpolated as weighted sums.
pub trait Texel: Copy {
    /// The additive identity.
    const ZERO: Self;

    /// Returns `self + other × weight`.
    #[must_use]
    fn add_weighted(self, other: Self, weight: f32) -> Self;
}

impl Texel for f32 {
    const ZERO: Self = 0.0;
    #[inline]
    fn add_weighted(self, other: Self, weight: f32) -> Self {
        other.mul_add(weight, self)
    }
}

impl Texel for [f32; 2] {
    const ZERO: Self = [0.0; 2];
    #[inline]
    fn add_weighted(self, other: Self, weight: f32) -> Self {
        [
            other[0].mul_add(weight, self[0]),
            other[1].mul_add(weight, self[1]),
        ]
    }
}

impl Texel for GradientSample {
    const ZERO: Self = GradientSample {
        direction: GradientVector::new(0.0, 0.0, 0.0),
        density: 0.0,
    };
    #[inline]
    fn add_weighted(self, other: Self, weight: f32) -> Self {
        GradientSample {
            direction: self.direction + other.direction * weight,
            density: other.density.mul_add(weight, self.density),
        }
    }
}

/// Samples `vol` at `point` in local cube space, where voxel centers lie at
/// `(i + 0.5) / n` along each axis. Coordinates beyond the outermost voxel centers take
/// the edge values.
#[inline]
pub fn sample<T: Texel>(vol: Vol<&[T]>, point: FreePoint, interpolation: Interpolation) -> T {
    match interpolation {
        Interpolation::Trilinear => trilinear(vol, point),
        Interpolation::Tricubic => tricubic(vol, point),
    }
}

/// Samples both channels of `texture`; the second is zero for a single-channel texture.
#[inline]
pub fn sample_density(
    texture: &DensityTexture,
    point: FreePoint,
    interpolation: Interpolation,
) -> [f32; 2] {
    match texture {
        DensityTexture::Single(vol) => [sample(vol.as_ref(), point, interpolation), 0.0],
        DensityTexture::Dual(vol) => sample(vol.as_ref(), point, interpolation),
        _ => [0.0; 2],
    }
}

/// Samples the gradient and packed density of `texture`.
#[inline]
pub fn sample_gradient(
    texture: &GradientTexture,
    point: FreePoint,
    interpolation: Interpolation,
) -> GradientSample {
    sample(texture.samples(), point, interpolation)
}

/// Splits a local coordinate into the index of the voxel center at or below it and the
/// fraction of the way to the next center.
#[inline]
fn voxel_coordinate(local: f64, n: u32) -> (i64, f32) {
    let u = local * f64::from(n) - 0.5;
    let floor = u.floor();
    (floor as i64, (u - floor) as f32)
}

/// 8-tap trilinear interpolation.
pub fn trilinear<T: Texel>(vol: Vol<&[T]>, point: FreePoint) -> T {
    let size = vol.size();
    let (x, fx) = voxel_coordinate(point.x, size.width);
    let (y, fy) = voxel_coordinate(point.y, size.height);
    let (z, fz) = voxel_coordinate(point.z, size.depth);
    let wx = [1.0 - fx, fx];
    let wy = [1.0 - fy, fy];
    let wz = [1.0 - fz, fz];

    let mut sum = T::ZERO;
    for (dz, &wz) in wz.iter().enumerate() {
        for (dy, &wy) in wy.iter().enumerate() {
            for (dx, &wx) in wx.iter().enumerate() {
                let weight = wx * wy * wz;
                if weight != 0.0 {
                    let v = *vol.get_clamped(x + dx as i64, y + dy as i64, z + dz as i64);
                    sum = sum.add_weighted(v, weight);
                }
            }
        }
    }
    sum
}

/// Weights of the uniform cubic B-spline for the four voxels around fraction `f`.
#[inline]
fn bspline_weights(f: f32) -> [f32; 4] {
    let f2 = f * f;
    let f3 = f2 * f;
    let one_minus = 1.0 - f;
    [
        one_minus * one_minus * one_minus / 6.0,
        (3.0 * f3 - 6.0 * f2 + 4.0) / 6.0,
        (-3.0 * f3 + 3.0 * f2 + 3.0 * f + 1.0) / 6.0,
        f3 / 6.0,
    ]
}

/// 64-tap tricubic B-spline interpolation.
///
/// The B-spline approximates rather than interpolates: it smooths the data slightly, and
/// does not overshoot.
pub fn tricubic<T: Texel>(vol: Vol<&[T]>, point: FreePoint) -> T {
    let size = vol.size();
    let (x, fx) = voxel_coordinate(point.x, size.width);
    let (y, fy) = voxel_coordinate(point.y, size.height);
    let (z, fz) = voxel_coordinate(point.z, size.depth);
    let wx = bspline_weights(fx);
    let wy = bspline_weights(fy);
    let wz = bspline_weights(fz);

    let mut sum = T::ZERO;
    for (dz, &wz) in (-1..=2).zip(wz.iter()) {
        for (dy, &wy) in (-1..=2).zip(wy.iter()) {
            for (dx, &wx) in (-1..=2).zip(wx.iter()) {
                let v = *vol.get_clamped(x + dx, y + dy, z + dz);
                sum = sum.add_weighted(v, wx * wy * wz);
            }
        }
    }
    sum
}
