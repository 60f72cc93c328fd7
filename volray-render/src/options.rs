//! [`RenderOptions`] and its component types.

use volray::math::{Aab, FreeCoordinate, FreePoint, FreeVector};

/// Options controlling how a volume is composited.
///
/// Density thresholds and windows are expressed in normalized density, `[0, 1]`, where
/// 0 is the minimum and 1 the maximum of the dataset's value range.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[non_exhaustive]
pub struct RenderOptions {
    /// Compositing technique.
    pub mode: RenderMode,

    /// Number of steps a ray takes to cross the full diagonal of the dataset cube.
    /// This determines the step length; shorter rays take proportionally fewer steps.
    pub max_steps: u32,

    /// Step count at which transfer-function opacities are taken literally.
    /// Opacities are corrected so that renderings with other step counts match it.
    pub reference_steps: u32,

    /// Multiplier applied to the color of every sample.
    pub intensity: f32,

    /// Samples with lower normalized density are not visible.
    pub threshold: f32,

    /// Only samples with normalized density in this inclusive range are visible.
    pub visibility_window: [f32; 2],

    /// Only samples whose local Z coordinate is in this inclusive range are visible.
    pub slice_window: [FreeCoordinate; 2],

    /// Region of the dataset to hide.
    pub cutout: Option<Cutout>,

    /// Gradient-based shading.
    pub lighting: LightingOptions,

    /// Attenuation by a [`ShadowVolume`](crate::ShadowVolume), if one is provided.
    pub shadow: ShadowOptions,

    /// Larger steps through nearly empty space.
    pub adaptive: AdaptiveStepping,

    /// How density and gradients are interpolated between voxel centers.
    pub interpolation: Interpolation,

    /// How a second volume combines with the first.
    pub blend: MultiVolumeBlend,

    /// In [`RenderMode::Surface`], samples with lower normalized gradient magnitude are
    /// not considered part of a surface.
    pub surface_gradient_threshold: f32,

    /// Scale, in steps, of the per-pixel random offset of the first sample, which breaks
    /// up banding caused by the step length. Zero disables jitter.
    pub jitter: f32,

    /// Farthest distance from the camera, in world units, at which anything is sampled.
    pub view_distance: FreeCoordinate,
}

impl RenderOptions {
    /// Default value of [`RenderOptions::max_steps`].
    pub const DEFAULT_MAX_STEPS: u32 = 512;

    /// Accumulated opacity past which compositing stops early.
    pub const EARLY_TERMINATION_OPACITY: f32 = 1.0 - 1.0 / 255.0;

    /// Accumulated opacity at which depth is recorded.
    pub const DEPTH_OPACITY: f32 = 0.15;

    /// Constrain fields to valid/practical values.
    #[must_use]
    pub fn repair(mut self) -> Self {
        self.max_steps = self.max_steps.clamp(1, 1 << 16);
        self.reference_steps = self.reference_steps.clamp(1, 1 << 16);
        self.intensity = finite_or(self.intensity, 1.0).max(0.0);
        self.threshold = finite_or(self.threshold, 0.0).clamp(0.0, 1.0);
        self.visibility_window = sorted_unit_range(self.visibility_window);
        self.slice_window = {
            let [a, b] = self.slice_window.map(|v| {
                if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
            });
            if a <= b { [a, b] } else { [b, a] }
        };
        self.lighting = self.lighting.repair();
        self.shadow.strength = finite_or(self.shadow.strength, 0.0).clamp(0.0, 1.0);
        self.adaptive.empty_threshold =
            finite_or(self.adaptive.empty_threshold, 0.0).clamp(0.0, 1.0);
        self.adaptive.skip_factor = self.adaptive.skip_factor.clamp(1, self.max_steps);
        self.surface_gradient_threshold =
            finite_or(self.surface_gradient_threshold, 0.0).clamp(0.0, 1.0);
        self.jitter = finite_or(self.jitter, 0.0).max(0.0);
        if self.view_distance.is_nan() || self.view_distance <= 0.0 {
            self.view_distance = FreeCoordinate::INFINITY;
        }
        self
    }

    /// Options with every stochastic or approximating feature turned off: no jitter and no
    /// adaptive stepping. Useful for reproducible comparisons.
    pub fn exact() -> Self {
        Self {
            jitter: 0.0,
            adaptive: AdaptiveStepping {
                enabled: false,
                ..AdaptiveStepping::default()
            },
            ..Self::default()
        }
    }

    /// Exponent applied to transparency by opacity correction.
    pub fn opacity_correction_exponent(&self) -> f32 {
        self.reference_steps as f32 / self.max_steps.max(1) as f32
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            mode: RenderMode::default(),
            max_steps: Self::DEFAULT_MAX_STEPS,
            reference_steps: Self::DEFAULT_MAX_STEPS,
            intensity: 1.0,
            threshold: 0.0,
            visibility_window: [0.0, 1.0],
            slice_window: [0.0, 1.0],
            cutout: None,
            lighting: LightingOptions::default(),
            shadow: ShadowOptions::default(),
            adaptive: AdaptiveStepping::default(),
            interpolation: Interpolation::default(),
            blend: MultiVolumeBlend::default(),
            surface_gradient_threshold: 0.0,
            jitter: 5.0,
            view_distance: FreeCoordinate::INFINITY,
        }
    }
}

/// Compositing technique; see the [`raymarch`](crate::raymarch) module.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum RenderMode {
    /// Direct volume rendering: front-to-back accumulation of color and opacity.
    #[default]
    Dvr,
    /// Maximum-intensity projection: the brightest sample along the ray.
    Mip,
    /// First-hit isosurface: the first visible sample along the ray, opaque.
    Surface,
}

/// How density and gradients are interpolated between voxel centers.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Interpolation {
    /// 8 samples.
    #[default]
    Trilinear,
    /// 64 samples weighted by the cubic B-spline. Smoother, and several times slower.
    Tricubic,
}

/// How a second volume in the scene combines with the first.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum MultiVolumeBlend {
    /// The second volume is ignored.
    #[default]
    None,
    /// Wherever the second volume has a visible sample, it replaces the first's.
    Overlay,
    /// The first volume is visible only where the second also has a visible sample.
    Isolate,
}

/// Gradient-based shading options.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[non_exhaustive]
pub struct LightingOptions {
    /// Whether shading is applied at all.
    pub enabled: bool,
    /// Normalized gradient magnitudes at which shading starts to blend in and is fully
    /// applied; below the first, samples are unshaded.
    pub gradient_band: [f32; 2],
    /// Direction toward the light, in local cube space.
    pub light_direction: FreeVector,
    /// Shading coefficients.
    pub ambient: f32,
    #[allow(missing_docs)]
    pub diffuse: f32,
    #[allow(missing_docs)]
    pub specular: f32,
    /// Specular exponent.
    pub shininess: f32,
}

impl LightingOptions {
    fn repair(mut self) -> Self {
        self.gradient_band = sorted_unit_range(self.gradient_band);
        let square_length = self.light_direction.square_length();
        if !(square_length.is_finite() && square_length > 0.0) {
            self.light_direction = Self::default().light_direction;
        }
        self.ambient = finite_or(self.ambient, 0.0).max(0.0);
        self.diffuse = finite_or(self.diffuse, 0.0).max(0.0);
        self.specular = finite_or(self.specular, 0.0).max(0.0);
        self.shininess = finite_or(self.shininess, 1.0).max(1.0);
        self
    }
}

impl Default for LightingOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            gradient_band: [0.05, 0.15],
            light_direction: FreeVector::new(0.3, 0.8, 0.5),
            ambient: 0.3,
            diffuse: 0.7,
            specular: 0.2,
            shininess: 20.0,
        }
    }
}

/// Shadow options.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[non_exhaustive]
pub struct ShadowOptions {
    /// Whether the scene's shadow volume, if any, is sampled.
    pub enabled: bool,
    /// 0 ignores shadows; 1 multiplies color by the full transmittance toward the light.
    pub strength: f32,
}

impl Default for ShadowOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            strength: 0.8,
        }
    }
}

/// Empty-space skipping options.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[non_exhaustive]
pub struct AdaptiveStepping {
    /// Whether empty-space skipping is used.
    pub enabled: bool,
    /// Samples with lower normalized density count as empty.
    pub empty_threshold: f32,
    /// After an empty sample, the ray advances by this many steps instead of one.
    pub skip_factor: u32,
}

impl Default for AdaptiveStepping {
    fn default() -> Self {
        Self {
            enabled: false,
            empty_threshold: 0.01,
            skip_factor: 4,
        }
    }
}

/// Which part of a [`Cutout`] region is hidden.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum CutoutMode {
    /// Hide everything inside the box.
    #[default]
    ExcludeInside,
    /// Hide everything outside the box.
    ExcludeOutside,
}

/// A box in local cube space whose inside or outside is hidden.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[expect(clippy::exhaustive_structs)]
pub struct Cutout {
    /// The box.
    pub bounds: Aab,
    /// Which side of it is hidden.
    pub mode: CutoutMode,
}

impl Cutout {
    /// Whether a sample at `point` is hidden by this cutout.
    #[inline]
    pub fn excludes(&self, point: FreePoint) -> bool {
        let inside = self.bounds.contains(point);
        match self.mode {
            CutoutMode::ExcludeInside => inside,
            CutoutMode::ExcludeOutside => !inside,
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

fn sorted_unit_range(range: [f32; 2]) -> [f32; 2] {
    let [a, b] = range.map(|v| finite_or(v, 0.0).clamp(0.0, 1.0));
    if a <= b { [a, b] } else { [b, a] }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_is_repaired() {
        assert_eq!(RenderOptions::default().repair(), RenderOptions::default());
    }

    #[test]
    fn repair_fixes_nonsense() {
        let options = RenderOptions {
            max_steps: 0,
            intensity: f32::NAN,
            visibility_window: [0.9, 0.1],
            slice_window: [2.0, -1.0],
            adaptive: AdaptiveStepping {
                enabled: true,
                empty_threshold: 0.1,
                skip_factor: 0,
            },
            view_distance: -1.0,
            ..RenderOptions::default()
        }
        .repair();
        assert_eq!(options.max_steps, 1);
        assert_eq!(options.intensity, 1.0);
        assert_eq!(options.visibility_window, [0.1, 0.9]);
        assert_eq!(options.slice_window, [0.0, 1.0]);
        assert_eq!(options.adaptive.skip_factor, 1);
        assert_eq!(options.view_distance, FreeCoordinate::INFINITY);
    }

    #[test]
    fn correction_exponent() {
        let options = RenderOptions {
            max_steps: 1024,
            reference_steps: 256,
            ..RenderOptions::default()
        };
        assert_eq!(options.opacity_correction_exponent(), 0.25);
    }

    #[test]
    fn cutout_modes() {
        let bounds = Aab::new(0.0, 0.5, 0.0, 0.5, 0.0, 0.5);
        let inside = FreePoint::new(0.25, 0.25, 0.25);
        let outside = FreePoint::new(0.75, 0.25, 0.25);
        let exclude_inside = Cutout {
            bounds,
            mode: CutoutMode::ExcludeInside,
        };
        let exclude_outside = Cutout {
            bounds,
            mode: CutoutMode::ExcludeOutside,
        };
        assert!(exclude_inside.excludes(inside));
        assert!(!exclude_inside.excludes(outside));
        assert!(!exclude_outside.excludes(inside));
        assert!(exclude_outside.excludes(outside));
    }
}
