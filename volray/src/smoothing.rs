//! Edge-preserving smoothing of density before gradient computation.

use core::fmt;

use crate::math::Vol;
use crate::parallel;

/// A smoothing pass applied to normalized density before the gradient is computed, used by
/// the smoothed [`GradientOperator`](crate::gradient::GradientOperator) variants.
///
/// Smoothing is optional: a [`Dataset`](crate::Dataset) configured without a smoother
/// falls back to the corresponding unsmoothed operator.
pub trait DensitySmoother: fmt::Debug + Send + Sync {
    /// Returns a smoothed copy of `density`, which has the same size.
    fn smooth(&self, density: Vol<&[f32]>) -> Vol<Box<[f32]>>;
}

/// Bilateral filter over a cubical neighborhood: neighbors are weighted both by their
/// distance and by how close their value is to the center voxel's, so that flat regions
/// are blurred while edges between materials stay sharp.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct BilateralSmoother {
    /// Neighborhood radius in voxels; 1 gives a 3×3×3 neighborhood.
    pub radius: u32,
    /// Standard deviation of the spatial weight, in voxels.
    pub spatial_sigma: f32,
    /// Standard deviation of the value weight, in normalized density units.
    pub range_sigma: f32,
}

impl Default for BilateralSmoother {
    fn default() -> Self {
        Self {
            radius: 1,
            spatial_sigma: 1.0,
            range_sigma: 0.1,
        }
    }
}

impl DensitySmoother for BilateralSmoother {
    fn smooth(&self, density: Vol<&[f32]>) -> Vol<Box<[f32]>> {
        let size = density.size();
        let r = i64::from(self.radius);
        let spatial_denominator = 2.0 * self.spatial_sigma * self.spatial_sigma;
        let range_denominator = 2.0 * self.range_sigma * self.range_sigma;

        let mut output = vec![0.0f32; density.volume()];
        parallel::map_z_slices(&mut output, density.slice_len(), |z, slice| {
            let z = i64::from(z);
            let mut index = 0;
            for y in 0..i64::from(size.height) {
                for x in 0..i64::from(size.width) {
                    let center = *density.get_clamped(x, y, z);
                    let mut weighted_sum = 0.0;
                    let mut weight_sum = 0.0;
                    for dz in -r..=r {
                        for dy in -r..=r {
                            for dx in -r..=r {
                                let value = *density.get_clamped(x + dx, y + dy, z + dz);
                                let distance_squared = (dx * dx + dy * dy + dz * dz) as f32;
                                let difference = value - center;
                                let weight = (-distance_squared / spatial_denominator
                                    - difference * difference / range_denominator)
                                    .exp();
                                weighted_sum += value * weight;
                                weight_sum += weight;
                            }
                        }
                    }
                    // The center voxel always has weight 1, so this never divides by zero.
                    slice[index] = weighted_sum / weight_sum;
                    index += 1;
                }
            }
        });

        Vol::from_elements(size, output.into_boxed_slice())
            .unwrap_or_else(|_| unreachable!("output was allocated with the input size"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::size3;

    #[test]
    fn uniform_field_is_unchanged() {
        let density = Vol::repeat(size3(4, 4, 4), 0.25f32);
        let smoothed = BilateralSmoother::default().smooth(density.as_ref());
        for &v in smoothed.as_linear() {
            assert!((v - 0.25).abs() < 1e-6, "{v}");
        }
    }

    #[test]
    fn noise_is_reduced_but_edge_is_kept() {
        // Left half near 0 with a small bump, right half at 1.
        let density = Vol::from_fn(size3(8, 3, 3), |p| {
            if p.x >= 4 {
                1.0
            } else if p.x == 1 && p.y == 1 && p.z == 1 {
                0.05
            } else {
                0.0
            }
        });
        let smoothed = BilateralSmoother::default().smooth(density.as_ref());
        // bump shrinks
        assert!(smoothed[[1, 1, 1]] < 0.05);
        // edge stays sharp: the voxels either side of it barely move
        assert!(smoothed[[3, 1, 1]] < 0.01, "{}", smoothed[[3, 1, 1]]);
        assert!(smoothed[[4, 1, 1]] > 0.99, "{}", smoothed[[4, 1, 1]]);
    }
}
