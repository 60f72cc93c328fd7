//! Compositing a single ray through a [`VolumeScene`].
//!
//! All modes share one setup: the ray, given in local cube space with a unit-length
//! direction, is clipped to the unit cube by the slab method and to the view distance,
//! which yields a [`RaymarchPlan`]. The ray is then sampled at fixed steps of
//! `√3 / max_steps` (so that a ray along the full diagonal takes `max_steps` steps), each
//! sample being classified (outside the cube, hidden, empty, invisible or visible) before
//! the mode-specific reduction:
//!
//! * [`RenderMode::Dvr`] accumulates opacity-corrected color front to back.
//! * [`RenderMode::Mip`] keeps the greatest visible density, back to front.
//! * [`RenderMode::Surface`] stops at the first visible sample.

use volray::gradient::GradientVector;
use volray::math::{Aab, FreeCoordinate, FreePoint, FreeVector, Rgb, Rgba, lerp, smoothstep};
use volray::raycast::Ray;

use crate::sample::{sample_density, sample_gradient};
use crate::scene::{VolumeLayer, VolumeScene};
use crate::{Interpolation, MultiVolumeBlend, RaymarchInfo, RenderMode, RenderOptions};

/// Tolerance for points which lie on the surface of the unit cube.
const CUBE_EPSILON: FreeCoordinate = 1e-6;

/// The portion of a ray inside the unit cube, and how it is divided into steps.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct RaymarchPlan {
    /// Parameter at which the ray enters the cube, or 0 if it starts inside.
    pub t_near: FreeCoordinate,
    /// Parameter at which the ray leaves the cube or reaches the view distance.
    pub t_far: FreeCoordinate,
    /// Distance between samples.
    pub step: FreeCoordinate,
    /// Number of samples, at least 1 and at most the requested maximum.
    pub num_steps: u32,
}

impl RaymarchPlan {
    /// Plans a march along `ray`, which must have a unit-length direction, stopping at
    /// parameter `far`.
    ///
    /// Returns [`None`] if the ray misses the cube or `far` ends it before the cube.
    pub fn new(ray: &Ray, max_steps: u32, far: FreeCoordinate) -> Option<Self> {
        let (t_near, t_far) = Aab::UNIT_CUBE.intersect_ray(ray);
        let t_near = t_near.max(0.0);
        let t_far = t_far.min(far);
        if !(t_near <= t_far) {
            return None;
        }
        let max_steps = max_steps.max(1);
        let step = 3f64.sqrt() / f64::from(max_steps);
        let num_steps = ((t_far - t_near) / step).ceil().clamp(1.0, f64::from(max_steps)) as u32;
        Some(Self {
            t_near,
            t_far,
            step,
            num_steps,
        })
    }
}

/// Converts an opacity given for the reference step count to the opacity for the actual
/// step count, `1 − (1 − alpha)^exponent`.
#[inline]
pub fn correct_opacity(alpha: f32, exponent: f32) -> f32 {
    1.0 - (1.0 - alpha.clamp(0.0, 1.0)).powf(exponent)
}

/// Result of marching one ray.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct RayOutcome {
    /// Composited color, not premultiplied.
    pub color: Rgba,
    /// Ray parameter of the depth sample, if any.
    pub depth: Option<FreeCoordinate>,
    /// Statistics.
    pub info: RaymarchInfo,
}

impl RayOutcome {
    fn miss(info: RaymarchInfo) -> Self {
        Self {
            color: Rgba::TRANSPARENT,
            depth: None,
            info,
        }
    }
}

/// Marches `ray` (in local cube space, with a unit-length direction) through `scene`,
/// up to parameter `far`.
///
/// `jitter` in `[0, 1)` offsets the first sample by that fraction of
/// [`RenderOptions::jitter`] steps. `options` should already have been
/// [repaired](RenderOptions::repair).
pub fn march_ray(
    scene: &VolumeScene,
    options: &RenderOptions,
    ray: Ray,
    far: FreeCoordinate,
    jitter: f32,
) -> RayOutcome {
    let mut info = RaymarchInfo {
        rays: 1,
        ..RaymarchInfo::default()
    };
    let Some(plan) = RaymarchPlan::new(&ray, options.max_steps, far) else {
        return RayOutcome::miss(info);
    };
    info.rays_hit = 1;
    let marcher = Marcher::new(scene, options, ray);
    let offset = f64::from(jitter) * f64::from(options.jitter) * plan.step;
    let (color, depth) = match options.mode {
        RenderMode::Mip => marcher.mip(&plan, offset, &mut info),
        RenderMode::Surface => marcher.surface(&plan, offset, &mut info),
        RenderMode::Dvr => marcher.dvr(&plan, offset, &mut info),
    };
    RayOutcome { color, depth, info }
}

// -------------------------------------------------------------------------------------------------

/// What was found at one sample position.
#[derive(Debug)]
enum Sample<'a> {
    /// Past the cube; marching ends.
    Outside,
    /// Removed by the slice window or the cutout.
    Hidden,
    /// Below the empty-space threshold; adaptive stepping may skip ahead.
    Empty,
    /// Rejected by the threshold, visibility window or multi-volume rule.
    Invisible,
    Visible(Candidate<'a>),
}

/// A visible sample, and the layer it belongs to.
#[derive(Debug)]
struct Candidate<'a> {
    layer: &'a VolumeLayer,
    densities: [f32; 2],
    value: f32,
    /// Present if it came with the density from the packed gradient resource.
    gradient: Option<GradientVector>,
}

/// Per-ray state shared by the compositing modes.
pub(crate) struct Marcher<'a> {
    scene: &'a VolumeScene,
    options: &'a RenderOptions,
    ray: Ray,
    correction_exponent: f32,
    skip_empty: bool,
}

impl<'a> Marcher<'a> {
    fn new(scene: &'a VolumeScene, options: &'a RenderOptions, ray: Ray) -> Self {
        Self {
            scene,
            options,
            ray,
            correction_exponent: options.opacity_correction_exponent(),
            skip_empty: options.adaptive.enabled && options.mode != RenderMode::Mip,
        }
    }

    fn interpolation(&self, layer: &VolumeLayer) -> Interpolation {
        layer.interpolation().unwrap_or(self.options.interpolation)
    }

    fn candidate(&self, layer: &'a VolumeLayer, point: FreePoint) -> Candidate<'a> {
        let interpolation = self.interpolation(layer);
        // A single channel is packed into the gradient resource, so one lookup serves both.
        let (densities, gradient) = match layer.gradient() {
            Some(texture) if layer.density().channel_count() == 1 => {
                let packed = sample_gradient(texture, point, interpolation);
                ([packed.density, 0.0], Some(packed.direction))
            }
            _ => (sample_density(layer.density(), point, interpolation), None),
        };
        let value = if layer.transfer_function().channel_count() > 1 {
            densities[0].max(densities[1])
        } else {
            densities[0]
        };
        Candidate {
            layer,
            densities,
            value,
            gradient,
        }
    }

    fn is_visible(&self, value: f32) -> bool {
        let [low, high] = self.options.visibility_window;
        value >= self.options.threshold && value >= low && value <= high
    }

    /// Classifies the sample at `point`.
    fn locate(&self, point: FreePoint) -> Sample<'a> {
        let options = self.options;
        let in_cube = [point.x, point.y, point.z]
            .iter()
            .all(|&c| (-CUBE_EPSILON..=1.0 + CUBE_EPSILON).contains(&c));
        if !in_cube {
            return Sample::Outside;
        }
        let [z_min, z_max] = options.slice_window;
        if point.z < z_min - CUBE_EPSILON
            || point.z > z_max + CUBE_EPSILON
            || options.cutout.is_some_and(|cutout| cutout.excludes(point))
        {
            return Sample::Hidden;
        }

        let primary = self.candidate(self.scene.primary(), point);
        let secondary = match (options.blend, self.scene.secondary()) {
            (MultiVolumeBlend::None, _) | (_, None) => None,
            (_, Some(layer)) => Some(self.candidate(layer, point)),
        };
        let secondary_visible = secondary.as_ref().is_some_and(|c| self.is_visible(c.value));

        if options.blend == MultiVolumeBlend::Overlay && secondary_visible {
            if let Some(secondary) = secondary {
                return Sample::Visible(secondary);
            }
        }
        if self.skip_empty
            && primary.value < options.adaptive.empty_threshold
            && secondary
                .as_ref()
                .is_none_or(|c| c.value < options.adaptive.empty_threshold)
        {
            return Sample::Empty;
        }
        if options.blend == MultiVolumeBlend::Isolate && secondary.is_some() && !secondary_visible
        {
            return Sample::Invisible;
        }
        if self.is_visible(primary.value) {
            Sample::Visible(primary)
        } else {
            Sample::Invisible
        }
    }

    fn gradient_at(&self, candidate: &Candidate<'_>, point: FreePoint) -> Option<GradientVector> {
        candidate.gradient.or_else(|| {
            let layer = candidate.layer;
            let texture = layer.gradient()?;
            Some(sample_gradient(texture, point, self.interpolation(layer)).direction)
        })
    }

    /// Classifies and lights a visible sample. The result is not premultiplied and its
    /// opacity is not yet corrected.
    fn shade(
        &self,
        candidate: &Candidate<'_>,
        point: FreePoint,
        gradient: Option<GradientVector>,
    ) -> Rgba {
        let options = self.options;
        let gradient_magnitude = gradient.map_or(0.0, |g| g.length());
        let classified = candidate
            .layer
            .transfer_function()
            .classify(candidate.densities, gradient_magnitude);
        let mut rgb = classified.to_rgb() * options.intensity;

        if options.lighting.enabled {
            if let Some(gradient) = gradient {
                let [low, high] = options.lighting.gradient_band;
                let blend = smoothstep(low, high, gradient_magnitude);
                if blend > 0.0 {
                    let lit = self.light(rgb, gradient, candidate.layer);
                    rgb = rgb.lerp(lit, blend);
                }
            }
        }

        if options.shadow.enabled {
            if let Some(shadow) = self.scene.shadow() {
                let transmittance = shadow.transmittance_at(point);
                rgb = rgb * lerp(1.0, transmittance, options.shadow.strength);
            }
        }

        rgb.with_alpha(classified.alpha())
    }

    /// Blinn-Phong shading with the surface normal opposite the density gradient.
    fn light(&self, rgb: Rgb, gradient: GradientVector, layer: &VolumeLayer) -> Rgb {
        let lighting = &self.options.lighting;
        let size = layer.density().size();
        // The gradient is per voxel; per unit of local space it is scaled by the size.
        let gradient = FreeVector::new(
            f64::from(gradient.x) * f64::from(size.width),
            f64::from(gradient.y) * f64::from(size.height),
            f64::from(gradient.z) * f64::from(size.depth),
        );
        let Some(mut normal) = (-gradient).try_normalize() else {
            return rgb;
        };
        let toward_eye = -self.ray.direction;
        if normal.dot(toward_eye) < 0.0 {
            normal = -normal;
        }
        let toward_light = lighting
            .light_direction
            .try_normalize()
            .unwrap_or(FreeVector::new(0.0, 1.0, 0.0));
        let half = (toward_light + toward_eye)
            .try_normalize()
            .unwrap_or(toward_light);

        let diffuse = normal.dot(toward_light).max(0.0) as f32;
        let specular = (normal.dot(half).max(0.0) as f32).powf(lighting.shininess);
        rgb * (lighting.ambient + lighting.diffuse * diffuse)
            + Rgb::ONE * (lighting.specular * specular)
    }

    fn dvr(
        &self,
        plan: &RaymarchPlan,
        offset: FreeCoordinate,
        info: &mut RaymarchInfo,
    ) -> (Rgba, Option<FreeCoordinate>) {
        let mut accumulated_rgb = Rgb::ZERO;
        let mut accumulated_alpha = 0.0f32;
        let mut depth = None;
        let skip = self.options.adaptive.skip_factor.max(1);

        let mut t = plan.t_near + offset;
        let mut i = 0;
        while i < plan.num_steps && t <= plan.t_far + CUBE_EPSILON {
            let point = self.ray.at(t);
            let sample = self.locate(point);
            if matches!(sample, Sample::Outside) {
                break;
            }
            info.samples += 1;
            match sample {
                Sample::Empty => {
                    info.skipped_empty += 1;
                    t += plan.step * f64::from(skip);
                    i = i.saturating_add(skip);
                    continue;
                }
                Sample::Visible(candidate) => {
                    let gradient = self.gradient_at(&candidate, point);
                    let color = self.shade(&candidate, point, gradient);
                    let alpha = correct_opacity(color.alpha(), self.correction_exponent);
                    if alpha > 0.0 {
                        let weight = (1.0 - accumulated_alpha) * alpha;
                        accumulated_rgb += color.to_rgb() * weight;
                        accumulated_alpha += weight;
                        if depth.is_none() && accumulated_alpha >= RenderOptions::DEPTH_OPACITY {
                            depth = Some(t);
                        }
                        if accumulated_alpha >= RenderOptions::EARLY_TERMINATION_OPACITY {
                            info.early_terminations += 1;
                            break;
                        }
                    }
                }
                Sample::Outside | Sample::Hidden | Sample::Invisible => {}
            }
            t += plan.step;
            i += 1;
        }

        let color = if accumulated_alpha > 0.0 {
            (accumulated_rgb * accumulated_alpha.recip()).with_alpha(accumulated_alpha)
        } else {
            Rgba::TRANSPARENT
        };
        (color, depth)
    }

    fn mip(
        &self,
        plan: &RaymarchPlan,
        offset: FreeCoordinate,
        info: &mut RaymarchInfo,
    ) -> (Rgba, Option<FreeCoordinate>) {
        let mut best: Option<(f32, FreeCoordinate)> = None;
        for i in 0..plan.num_steps {
            let t = plan.t_far - offset - plan.step * f64::from(i);
            if t < plan.t_near - CUBE_EPSILON {
                break;
            }
            match self.locate(self.ray.at(t)) {
                Sample::Outside => continue,
                Sample::Visible(candidate) => {
                    if best.is_none_or(|(value, _)| candidate.value >= value) {
                        best = Some((candidate.value, t));
                    }
                }
                Sample::Hidden | Sample::Empty | Sample::Invisible => {}
            }
            info.samples += 1;
        }
        match best {
            Some((value, t)) if value > 0.0 => {
                ((Rgb::ONE * self.options.intensity).with_alpha(value), Some(t))
            }
            _ => (Rgba::TRANSPARENT, None),
        }
    }

    fn surface(
        &self,
        plan: &RaymarchPlan,
        offset: FreeCoordinate,
        info: &mut RaymarchInfo,
    ) -> (Rgba, Option<FreeCoordinate>) {
        let skip = self.options.adaptive.skip_factor.max(1);
        let mut t = plan.t_near + offset;
        let mut i = 0;
        while i < plan.num_steps && t <= plan.t_far + CUBE_EPSILON {
            let point = self.ray.at(t);
            let sample = self.locate(point);
            if matches!(sample, Sample::Outside) {
                break;
            }
            info.samples += 1;
            match sample {
                Sample::Empty => {
                    info.skipped_empty += 1;
                    t += plan.step * f64::from(skip);
                    i = i.saturating_add(skip);
                    continue;
                }
                Sample::Visible(candidate) => {
                    let gradient = self.gradient_at(&candidate, point);
                    let magnitude = gradient.map_or(0.0, |g| g.length());
                    if magnitude >= self.options.surface_gradient_threshold {
                        info.early_terminations += 1;
                        let color = self.shade(&candidate, point, gradient);
                        return (color.to_rgb().with_alpha_one(), Some(t));
                    }
                }
                Sample::Outside | Sample::Hidden | Sample::Invisible => {}
            }
            t += plan.step;
            i += 1;
        }
        (Rgba::TRANSPARENT, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::{TransferFunction1D, grayscale_ramp, step_1d};
    use crate::{Cutout, CutoutMode, TransferFunction};
    use euclid::{point3, size3, vec3};
    use rstest::rstest;
    use std::sync::Arc;
    use volray::VolumeTransform;
    use volray::gradient::{GradientField, GradientOperator};
    use volray::math::{Vol, WorldSize};
    use volray::resource::{DensityTexture, GradientTexture};

    fn scene_of(vol: Vol<Box<[f32]>>, tf: TransferFunction) -> VolumeScene {
        let layer = VolumeLayer::new(Arc::new(DensityTexture::Single(vol)), None, tf).unwrap();
        VolumeScene::new(VolumeTransform::new(WorldSize::new(1.0, 1.0, 1.0)), layer)
    }

    fn axis_ray() -> Ray {
        Ray::new([0.5, 0.5, -1.0], [0.0, 0.0, 1.0])
    }

    #[test]
    fn plan_through_center() {
        let plan = RaymarchPlan::new(&axis_ray(), 128, f64::INFINITY).unwrap();
        assert_eq!((plan.t_near, plan.t_far), (1.0, 2.0));
        assert_eq!(plan.num_steps, 74);
    }

    #[test]
    fn plan_from_inside_and_view_distance() {
        let ray = Ray::new([0.5, 0.5, 0.5], [0.0, 0.0, 1.0]);
        let plan = RaymarchPlan::new(&ray, 100, 0.25).unwrap();
        assert_eq!((plan.t_near, plan.t_far), (0.0, 0.25));
        assert_eq!(RaymarchPlan::new(&axis_ray(), 100, 0.5), None);
    }

    #[test]
    fn plan_misses() {
        let ray = Ray::new([2.0, 0.5, -1.0], [0.0, 0.0, 1.0]);
        assert_eq!(RaymarchPlan::new(&ray, 100, f64::INFINITY), None);
    }

    #[test]
    fn correct_opacity_identity_and_composition() {
        assert_eq!(correct_opacity(0.3, 1.0), 0.3);
        let half = correct_opacity(0.3, 0.5);
        let twice = 1.0 - (1.0 - half) * (1.0 - half);
        assert!((twice - 0.3).abs() < 1e-6);
    }

    #[test]
    fn hidden_by_slice_window_and_cutout() {
        let scene = scene_of(
            Vol::repeat(size3(4, 4, 4), 1.0),
            TransferFunction::OneD(step_1d(0.5, Rgba::WHITE)),
        );
        let mut options = RenderOptions::exact();
        options.slice_window = [0.5, 1.0];
        options.cutout = Some(Cutout {
            bounds: Aab::new(0.0, 1.0, 0.0, 1.0, 0.75, 1.0),
            mode: CutoutMode::ExcludeInside,
        });
        let marcher = Marcher::new(&scene, &options, axis_ray());
        assert!(matches!(marcher.locate(point3(0.5, 0.5, 0.25)), Sample::Hidden));
        assert!(matches!(marcher.locate(point3(0.5, 0.5, 0.6)), Sample::Visible(_)));
        assert!(matches!(marcher.locate(point3(0.5, 0.5, 0.9)), Sample::Hidden));
        assert!(matches!(marcher.locate(point3(0.5, 0.5, 1.1)), Sample::Outside));
    }

    #[test]
    fn adaptive_stepping_skips_empty_space() {
        let vol = Vol::from_fn(size3(1, 1, 64), |p| if p.z >= 48 { 1.0 } else { 0.0 });
        let scene = scene_of(vol, TransferFunction::OneD(step_1d(0.5, Rgba::WHITE)));
        let mut options = RenderOptions::exact();
        options.max_steps = 256;
        let exact = march_ray(&scene, &options, axis_ray(), f64::INFINITY, 0.0);
        options.adaptive.enabled = true;
        let adaptive = march_ray(&scene, &options, axis_ray(), f64::INFINITY, 0.0);

        assert!(adaptive.info.skipped_empty > 0);
        assert!(adaptive.info.samples < exact.info.samples);
        assert_eq!(exact.color, Rgba::WHITE);
        assert_eq!(adaptive.color, Rgba::WHITE);
        assert_eq!(adaptive.info.early_terminations, 1);
    }

    #[test]
    fn lighting_darkens_surfaces_facing_away_from_light() {
        // Density increases along +Z, so the normal faces -Z, toward the eye.
        let vol = Vol::from_fn(size3(4, 4, 16), |p| p.z as f32 / 15.0);
        let layer = VolumeLayer::new(
            Arc::new(DensityTexture::Single(vol)),
            None,
            TransferFunction::OneD(TransferFunction1D::constant(Rgba::WHITE)),
        )
        .unwrap();
        let scene = VolumeScene::new(VolumeTransform::new(WorldSize::new(1.0, 1.0, 1.0)), layer);
        let mut options = RenderOptions::exact();
        options.lighting.enabled = true;
        options.lighting.light_direction = vec3(0.0, 0.0, 1.0);
        options.lighting.specular = 0.0;
        let marcher = Marcher::new(&scene, &options, axis_ray());
        let candidate = marcher.candidate(scene.primary(), point3(0.5, 0.5, 0.5));

        let lit = marcher.shade(
            &candidate,
            point3(0.5, 0.5, 0.5),
            Some(GradientVector::new(0.0, 0.0, 1.0)),
        );
        // The light is behind the surface: only ambient remains.
        assert!((lit.to_rgb().red() - options.lighting.ambient).abs() < 1e-6);

        let unlit = marcher.shade(&candidate, point3(0.5, 0.5, 0.5), None);
        assert_eq!(unlit, Rgba::WHITE);
    }

    #[test]
    fn huge_skip_factor_ends_the_ray() {
        let vol = Vol::from_fn(size3(1, 1, 8), |p| if p.z < 4 { 0.3 } else { 0.0 });
        let scene = scene_of(vol, TransferFunction::OneD(step_1d(0.5, Rgba::WHITE)));
        let mut options = RenderOptions::exact();
        options.adaptive.enabled = true;
        options.adaptive.skip_factor = u32::MAX;

        let unrepaired = march_ray(&scene, &options, axis_ray(), f64::INFINITY, 0.0);
        assert_eq!(unrepaired.color, Rgba::TRANSPARENT);
        assert_eq!(unrepaired.info.skipped_empty, 1);

        let options = options.repair();
        assert_eq!(options.adaptive.skip_factor, options.max_steps);
        for mode in [RenderMode::Dvr, RenderMode::Surface] {
            let mut options = options.clone();
            options.mode = mode;
            let outcome = march_ray(&scene, &options, axis_ray(), f64::INFINITY, 0.0);
            assert_eq!(outcome.color, Rgba::TRANSPARENT, "{mode:?}");
        }
    }

    #[rstest]
    #[case::below_band(0.1, 1.0)]
    #[case::inside_band(0.4, 0.65)]
    #[case::above_band(0.8, 0.3)]
    fn lighting_blends_in_across_gradient_band(#[case] magnitude: f32, #[case] expected: f32) {
        let scene = scene_of(
            Vol::repeat(size3(2, 2, 2), 0.5),
            TransferFunction::OneD(TransferFunction1D::constant(Rgba::WHITE)),
        );
        let mut options = RenderOptions::exact();
        options.lighting.enabled = true;
        options.lighting.gradient_band = [0.2, 0.6];
        // Light from behind, so that fully lit means ambient only.
        options.lighting.light_direction = vec3(0.0, 0.0, 1.0);
        options.lighting.ambient = 0.3;
        options.lighting.specular = 0.0;
        let marcher = Marcher::new(&scene, &options, axis_ray());
        let point = point3(0.5, 0.5, 0.5);
        let candidate = marcher.candidate(scene.primary(), point);

        let color = marcher.shade(
            &candidate,
            point,
            Some(GradientVector::new(0.0, 0.0, magnitude)),
        );
        assert!(
            (color.red() - expected).abs() < 1e-5,
            "{color:?} at magnitude {magnitude}"
        );
        assert_eq!(color.alpha(), 1.0);
    }

    #[test]
    fn single_channel_density_comes_from_gradient_resource() {
        let vol = Vol::from_fn(size3(4, 4, 8), |p| p.z as f32 / 7.0);
        let field = GradientField::compute(vol.as_ref(), GradientOperator::CentralDifference, None);
        let gradient = Arc::new(GradientTexture::new(&field, vol.as_ref()));
        let tf = TransferFunction::OneD(grayscale_ramp());
        let density = Arc::new(DensityTexture::Single(vol));
        let with_gradient = VolumeLayer::new(density.clone(), Some(gradient), tf.clone()).unwrap();
        let without_gradient = VolumeLayer::new(density, None, tf).unwrap();
        let scene = VolumeScene::new(
            VolumeTransform::new(WorldSize::new(1.0, 1.0, 1.0)),
            with_gradient.clone(),
        );
        let options = RenderOptions::exact();
        let marcher = Marcher::new(&scene, &options, axis_ray());

        for point in [point3(0.5, 0.5, 0.3), point3(0.1, 0.9, 0.77)] {
            let packed = marcher.candidate(&with_gradient, point);
            let separate = marcher.candidate(&without_gradient, point);
            assert!((packed.value - separate.value).abs() < 1e-6);
            let gradient = packed.gradient.unwrap();
            assert!(gradient.z > 0.0, "{gradient:?}");
            assert_eq!(separate.gradient, None);
        }
    }

    #[test]
    fn tricubic_layer_smooths_surface_depth() {
        // A sharp step halfway along Z.
        let vol = Vol::from_fn(size3(1, 1, 16), |p| if p.z >= 8 { 1.0 } else { 0.0 });
        let tf = TransferFunction::OneD(step_1d(0.5, Rgba::WHITE));
        let trilinear = scene_of(vol.clone(), tf.clone());
        let tricubic_layer = VolumeLayer::new(Arc::new(DensityTexture::Single(vol)), None, tf)
            .unwrap()
            .with_interpolation(Interpolation::Tricubic);
        let tricubic = VolumeScene::new(
            VolumeTransform::new(WorldSize::new(1.0, 1.0, 1.0)),
            tricubic_layer,
        );
        let mut options = RenderOptions::exact();
        options.mode = RenderMode::Surface;
        options.threshold = 0.9;
        options.interpolation = Interpolation::Trilinear;

        let linear_depth = march_ray(&trilinear, &options, axis_ray(), f64::INFINITY, 0.0)
            .depth
            .unwrap();
        let cubic_depth = march_ray(&tricubic, &options, axis_ray(), f64::INFINITY, 0.0)
            .depth
            .unwrap();
        // The trilinear crossing is at local z ≈ 0.525; the B-spline one at ≈ 0.541.
        assert!((linear_depth - 1.525).abs() < 0.01, "{linear_depth}");
        assert!(cubic_depth > linear_depth + 0.01, "{cubic_depth} vs {linear_depth}");
    }
}
