//! Per-voxel density gradients.

use core::fmt;

use euclid::Vector3D;

use crate::math::{Vol, Voxel};
use crate::parallel;
use crate::smoothing::DensitySmoother;

/// A density gradient, in normalized density units per voxel.
pub type GradientVector = Vector3D<f32, Voxel>;

/// Smallest maximum magnitude that normalization will divide by.
///
/// A field with no variation has a maximum magnitude of zero; dividing by this floor
/// instead leaves its gradients at zero rather than producing NaN.
pub const MIN_NORMALIZING_MAGNITUDE: f32 = 1e-6;

/// Selects how gradients are computed.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum GradientOperator {
    /// Half the difference of the two neighbors along each axis.
    #[default]
    CentralDifference,
    /// 3×3×3 Sobel kernel: the central difference along each axis, averaged over the
    /// neighboring rows with weights 1, 2, 1 across the other two axes.
    /// Smoother normals at higher cost.
    Sobel,
    /// [`GradientOperator::CentralDifference`] applied after edge-preserving smoothing.
    SmoothedCentralDifference,
    /// [`GradientOperator::Sobel`] applied after edge-preserving smoothing.
    SmoothedSobel,
}

impl GradientOperator {
    /// All operators, for use in tests and option listings.
    pub const ALL: [Self; 4] = [
        Self::CentralDifference,
        Self::Sobel,
        Self::SmoothedCentralDifference,
        Self::SmoothedSobel,
    ];

    /// Whether this operator smooths density before differencing.
    pub fn is_smoothed(self) -> bool {
        matches!(self, Self::SmoothedCentralDifference | Self::SmoothedSobel)
    }

    /// The same differencing kernel without smoothing.
    #[must_use]
    pub fn unsmoothed(self) -> Self {
        match self {
            Self::CentralDifference | Self::SmoothedCentralDifference => Self::CentralDifference,
            Self::Sobel | Self::SmoothedSobel => Self::Sobel,
        }
    }
}

impl fmt::Display for GradientOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CentralDifference => "central difference",
            Self::Sobel => "Sobel",
            Self::SmoothedCentralDifference => "smoothed central difference",
            Self::SmoothedSobel => "smoothed Sobel",
        })
    }
}

/// Gradient vectors for every voxel of a density field, with their maximum magnitude.
#[derive(Clone, PartialEq)]
pub struct GradientField {
    vectors: Vol<Box<[GradientVector]>>,
    max_magnitude: f32,
    operator: GradientOperator,
}

impl GradientField {
    /// Computes the gradient of normalized `density` with `operator`.
    ///
    /// The smoothed operators use `smoother`; if it is [`None`], this logs a warning and
    /// uses the corresponding unsmoothed operator instead. [`GradientField::operator()`]
    /// reports which operator was actually applied.
    ///
    /// Slices along Z are computed independently (in parallel with the `auto-threads`
    /// feature), each reading only its immediate neighborhood. The maximum magnitude is
    /// then reduced from the per-slice maxima on the calling thread.
    pub fn compute(
        density: Vol<&[f32]>,
        operator: GradientOperator,
        smoother: Option<&dyn DensitySmoother>,
    ) -> Self {
        let smoothed;
        let (density, operator) = match (operator.is_smoothed(), smoother) {
            (true, Some(smoother)) => {
                smoothed = smoother.smooth(density);
                (smoothed.as_ref(), operator)
            }
            (true, None) => {
                log::warn!(
                    "no density smoother available for {operator} gradients; \
                        using unsmoothed {fallback}",
                    fallback = operator.unsmoothed()
                );
                (density, operator.unsmoothed())
            }
            (false, _) => (density, operator),
        };
        let kernel = Kernel::of(operator);

        let size = density.size();
        let mut vectors = vec![GradientVector::zero(); density.volume()];
        let slice_maxima = parallel::map_z_slices(&mut vectors, density.slice_len(), |z, slice| {
            let z = i64::from(z);
            let mut slice_max: f32 = 0.0;
            let mut index = 0;
            for y in 0..i64::from(size.height) {
                for x in 0..i64::from(size.width) {
                    let g = match kernel {
                        Kernel::Central => central_difference(density, x, y, z),
                        Kernel::Sobel => sobel(density, x, y, z),
                    };
                    slice_max = slice_max.max(g.length());
                    slice[index] = g;
                    index += 1;
                }
            }
            slice_max
        });
        let max_magnitude = slice_maxima.into_iter().fold(0.0, f32::max);

        Self {
            vectors: Vol::from_elements(size, vectors.into_boxed_slice())
                .unwrap_or_else(|_| unreachable!("output was allocated with the input size")),
            max_magnitude,
            operator,
        }
    }

    /// Returns the gradient at `index`, scaled so that the largest gradient in the field
    /// has length 1.
    pub fn normalized(&self, index: usize) -> GradientVector {
        self.vectors.as_linear()[index] / self.normalizing_divisor()
    }

    /// The gradient vectors, in normalized density units per voxel.
    pub fn vectors(&self) -> Vol<&[GradientVector]> {
        self.vectors.as_ref()
    }

    /// The largest gradient magnitude in the field. Zero for a constant field.
    pub fn max_magnitude(&self) -> f32 {
        self.max_magnitude
    }

    /// The operator that was applied, which differs from the requested one if smoothing
    /// was unavailable.
    pub fn operator(&self) -> GradientOperator {
        self.operator
    }

    /// Divisor that scales every gradient magnitude into `[0, 1]`.
    pub fn normalizing_divisor(&self) -> f32 {
        self.max_magnitude.max(MIN_NORMALIZING_MAGNITUDE)
    }
}

impl fmt::Debug for GradientField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GradientField")
            .field("vectors", &self.vectors)
            .field("max_magnitude", &self.max_magnitude)
            .field("operator", &self.operator)
            .finish()
    }
}

#[derive(Clone, Copy)]
enum Kernel {
    Central,
    Sobel,
}

impl Kernel {
    fn of(operator: GradientOperator) -> Self {
        match operator.unsmoothed() {
            GradientOperator::Sobel => Kernel::Sobel,
            _ => Kernel::Central,
        }
    }
}

#[inline]
fn central_difference(v: Vol<&[f32]>, x: i64, y: i64, z: i64) -> GradientVector {
    let at = |x, y, z| *v.get_clamped(x, y, z);
    GradientVector::new(
        at(x + 1, y, z) - at(x - 1, y, z),
        at(x, y + 1, z) - at(x, y - 1, z),
        at(x, y, z + 1) - at(x, y, z - 1),
    ) * 0.5
}

/// Weights of the smoothing half of the Sobel kernel, for offsets −1, 0, 1.
const SOBEL_SMOOTH: [f32; 3] = [1.0, 2.0, 1.0];

#[inline]
fn sobel(v: Vol<&[f32]>, x: i64, y: i64, z: i64) -> GradientVector {
    let at = |x, y, z| *v.get_clamped(x, y, z);
    let mut g = GradientVector::zero();
    for (i, a) in (-1..=1).enumerate() {
        for (j, b) in (-1..=1).enumerate() {
            let w = SOBEL_SMOOTH[i] * SOBEL_SMOOTH[j];
            g.x += w * (at(x + 1, y + a, z + b) - at(x - 1, y + a, z + b));
            g.y += w * (at(x + a, y + 1, z + b) - at(x + a, y - 1, z + b));
            g.z += w * (at(x + a, y + b, z + 1) - at(x + a, y + b, z - 1));
        }
    }
    // The smoothing weights sum to 16 and the difference spans 2 voxels; dividing by
    // their product gives the same scale as the central difference.
    g / 32.0
}
