//! [`ShadowVolume`]: precomputed transmittance toward a light.

use volray::math::{Aab, FreePoint, FreeVector, GridSize, Vol, max_dimension};
use volray::resource::{DensityTexture, GradientTexture};

use crate::sample::{sample_density, sample_gradient, trilinear};
use crate::{Interpolation, TransferFunction};

/// Transmittance below which marching toward the light stops; the voxel is fully shadowed
/// for display purposes.
const OPAQUE_TRANSMITTANCE: f32 = 1.0 / 255.0;

/// Fraction of light reaching each point of a volume from a directional light, after
/// passing through the rest of the volume as classified by a transfer function.
///
/// Computed at reduced resolution, since shadows vary slowly, and sampled with trilinear
/// interpolation.
#[derive(Clone, Debug, PartialEq)]
pub struct ShadowVolume {
    transmittance: Vol<Box<[f32]>>,
    light_direction: FreeVector,
}

impl ShadowVolume {
    /// Marches from the center of every shadow voxel toward the light, one density voxel
    /// per step, multiplying transmittance by `1 − opacity` of each classified sample.
    ///
    /// `light_direction` points toward the light, in local cube space.
    /// `resolution_divisor` (at least 1) divides the density resolution on each axis.
    pub fn compute(
        density: &DensityTexture,
        gradient: Option<&GradientTexture>,
        transfer_function: &TransferFunction,
        light_direction: FreeVector,
        resolution_divisor: u32,
    ) -> Self {
        let divisor = resolution_divisor.max(1);
        let full_size = density.size();
        let size = GridSize::new(
            full_size.width.div_ceil(divisor),
            full_size.height.div_ceil(divisor),
            full_size.depth.div_ceil(divisor),
        );
        let direction = light_direction
            .try_normalize()
            .unwrap_or(FreeVector::new(0.0, 1.0, 0.0));
        let step = 1.0 / f64::from(max_dimension(full_size).max(1));
        let max_steps = (3f64.sqrt() / step).ceil() as usize + 1;

        let transmittance_toward_light = |start: FreePoint| -> f32 {
            let mut transmittance = 1.0f32;
            for i in 1..=max_steps {
                let p = start + direction * (step * i as f64);
                if !Aab::UNIT_CUBE.contains(p) || transmittance < OPAQUE_TRANSMITTANCE {
                    break;
                }
                let densities = sample_density(density, p, Interpolation::Trilinear);
                let gradient_magnitude = gradient.map_or(0.0, |g| {
                    sample_gradient(g, p, Interpolation::Trilinear).direction.length()
                });
                let alpha = transfer_function
                    .classify(densities, gradient_magnitude)
                    .alpha();
                transmittance *= 1.0 - alpha;
            }
            transmittance
        };

        let shape = Vol::new_dataless(size)
            .unwrap_or_else(|_| unreachable!("shadow volume is no larger than the density"));
        let slice_len = shape.slice_len();
        let mut values = vec![1.0f32; shape.volume()];
        let voxel_center = |i: u32, n: u32| (f64::from(i) + 0.5) / f64::from(n);
        let fill_slice = |z: usize, slice: &mut [f32]| {
            let mut index = 0;
            for y in 0..size.height {
                for x in 0..size.width {
                    slice[index] = transmittance_toward_light(FreePoint::new(
                        voxel_center(x, size.width),
                        voxel_center(y, size.height),
                        voxel_center(z as u32, size.depth),
                    ));
                    index += 1;
                }
            }
        };

        #[cfg(feature = "auto-threads")]
        {
            use rayon::iter::{IndexedParallelIterator as _, ParallelIterator as _};
            use rayon::slice::ParallelSliceMut as _;
            values
                .par_chunks_mut(slice_len.max(1))
                .enumerate()
                .for_each(|(z, slice)| fill_slice(z, slice));
        }
        #[cfg(not(feature = "auto-threads"))]
        {
            for (z, slice) in values.chunks_mut(slice_len.max(1)).enumerate() {
                fill_slice(z, slice);
            }
        }

        log::debug!(
            "computed {}×{}×{} shadow volume",
            size.width,
            size.height,
            size.depth
        );
        Self {
            transmittance: Vol::from_elements(size, values)
                .unwrap_or_else(|_| unreachable!("allocated with the shadow size")),
            light_direction: direction,
        }
    }

    /// Transmittance toward the light at `point` in local cube space, in `[0, 1]`.
    #[inline]
    pub fn transmittance_at(&self, point: FreePoint) -> f32 {
        trilinear(self.transmittance.as_ref(), point).clamp(0.0, 1.0)
    }

    /// The computed transmittance values.
    pub fn transmittance(&self) -> Vol<&[f32]> {
        self.transmittance.as_ref()
    }

    /// Unit direction toward the light, in local cube space.
    pub fn light_direction(&self) -> FreeVector {
        self.light_direction
    }
}
