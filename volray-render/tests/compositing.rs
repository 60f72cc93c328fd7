//! Behavior of the compositing modes on small synthetic volumes.

use std::sync::Arc;

use euclid::{size3, vec3};
use pretty_assertions::assert_eq;
use rstest::rstest;

use volray::VolumeTransform;
use volray::math::{Rgb, Rgba, Vol, WorldSize};
use volray::raycast::Ray;
use volray::resource::DensityTexture;
use volray_render::raymarch::{RayOutcome, march_ray};
use volray_render::transfer::{TransferFunction1D, grayscale_ramp, step_1d};
use volray_render::{
    MultiVolumeBlend, RenderMode, RenderOptions, ShadowVolume, TransferFunction, VolumeLayer,
    VolumeScene,
};

fn layer(vol: Vol<Box<[f32]>>, tf: TransferFunction1D) -> VolumeLayer {
    VolumeLayer::new(
        Arc::new(DensityTexture::Single(vol)),
        None,
        TransferFunction::OneD(tf),
    )
    .unwrap()
}

fn scene(layer: VolumeLayer) -> VolumeScene {
    VolumeScene::new(VolumeTransform::new(WorldSize::new(1.0, 1.0, 1.0)), layer)
}

/// Enters the cube at `t = 1` through the center of the z = 0 face.
fn axis_ray() -> Ray {
    Ray::new([0.5, 0.5, -1.0], [0.0, 0.0, 1.0])
}

fn options(mode: RenderMode) -> RenderOptions {
    let mut options = RenderOptions::exact();
    options.mode = mode;
    options
}

fn march(scene: &VolumeScene, options: &RenderOptions) -> RayOutcome {
    march_ray(scene, options, axis_ray(), f64::INFINITY, 0.0)
}

/// A column of four density plateaus along Z: 0, 0.4, 0.8, 1.0.
fn staircase() -> Vol<Box<[f32]>> {
    Vol::from_fn(size3(1, 1, 16), |p| [0.0, 0.4, 0.8, 1.0][(p.z / 4) as usize])
}

#[rstest]
fn opacity_correction_is_step_count_invariant(#[values(64, 128, 256, 1024)] steps: u32) {
    let scene = scene(layer(
        Vol::repeat(size3(4, 4, 4), 0.5),
        TransferFunction1D::constant(Rgb::ONE.with_alpha(0.01)),
    ));
    let mut reference = options(RenderMode::Dvr);
    reference.max_steps = 512;
    let mut other = reference.clone();
    other.max_steps = steps;

    let expected = march(&scene, &reference).color.alpha();
    let actual = march(&scene, &other).color.alpha();
    assert!(expected > 0.5, "{expected}");
    assert!(
        (expected - actual).abs() < 0.01,
        "{steps} steps: {actual}, 512 steps: {expected}"
    );
}

#[test]
fn mip_below_threshold_is_transparent() {
    let scene = scene(layer(Vol::repeat(size3(4, 4, 4), 0.3), grayscale_ramp()));
    let mut options = options(RenderMode::Mip);
    options.threshold = 0.5;
    let outcome = march(&scene, &options);
    assert_eq!(outcome.color.alpha(), 0.0);
    assert_eq!(outcome.depth, None);
}

#[test]
fn mip_finds_the_peak() {
    // A single plateau of 0.6 between voxels 6 and 9.
    let vol = Vol::from_fn(size3(1, 1, 16), |p| if (6..10).contains(&p.z) { 0.6 } else { 0.0 });
    let scene = scene(layer(vol, grayscale_ramp()));
    let outcome = march(&scene, &options(RenderMode::Mip));
    assert!((outcome.color.alpha() - 0.6).abs() < 1e-5, "{:?}", outcome.color);
    let depth = outcome.depth.unwrap();
    assert!((1.0 + 6.5 / 16.0..=1.0 + 9.5 / 16.0).contains(&depth), "{depth}");
}

#[test]
fn mip_respects_visibility_window() {
    let scene = scene(layer(staircase(), grayscale_ramp()));
    let mut options = options(RenderMode::Mip);
    let outcome = march(&scene, &options);
    assert!((outcome.color.alpha() - 1.0).abs() < 1e-5);
    assert!(outcome.depth.unwrap() > 1.75, "{:?}", outcome.depth);

    // Excluding the top plateau leaves the one below as the maximum.
    options.visibility_window = [0.0, 0.85];
    let outcome = march(&scene, &options);
    assert!((0.8..=0.85).contains(&outcome.color.alpha()), "{:?}", outcome.color);
}

#[test]
fn surface_returns_first_qualifying_sample() {
    let scene = scene(layer(staircase(), grayscale_ramp()));
    let step = 3f64.sqrt() / 512.0;
    let mut options = options(RenderMode::Surface);

    // 0.3 is reached three quarters of the way from the center of voxel 3 to voxel 4.
    options.threshold = 0.3;
    let first = march(&scene, &options);
    assert_eq!(first.color.alpha(), 1.0);
    assert_eq!(first.info.early_terminations, 1);
    let depth = first.depth.unwrap();
    assert!(
        depth >= 1.265625 - 1e-6 && depth < 1.265625 + step,
        "{depth}"
    );

    // Raising the threshold past that density moves the hit farther along.
    options.threshold = 0.9;
    let second = march(&scene, &options);
    let depth = second.depth.unwrap();
    assert!(depth >= 1.75 - 1e-6 && depth < 1.75 + step, "{depth}");

    // Or removes it entirely.
    options.visibility_window = [0.0, 0.85];
    let none = march(&scene, &options);
    assert_eq!(none.color, Rgba::TRANSPARENT);
    assert_eq!(none.depth, None);
}

#[rstest]
fn ray_missing_the_cube_contributes_nothing(
    #[values(RenderMode::Dvr, RenderMode::Mip, RenderMode::Surface)] mode: RenderMode,
) {
    let scene = scene(layer(Vol::repeat(size3(2, 2, 2), 1.0), grayscale_ramp()));
    let ray = Ray::new([1.5, 0.5, -1.0], [0.0, 0.0, 1.0]);
    let outcome = march_ray(&scene, &options(mode), ray, f64::INFINITY, 0.0);
    assert_eq!(outcome.color, Rgba::TRANSPARENT);
    assert_eq!(outcome.depth, None);
    assert_eq!((outcome.info.rays, outcome.info.rays_hit), (1, 0));
}

#[test]
fn overlay_prefers_secondary() {
    let red = Rgb::new(1.0, 0.0, 0.0).with_alpha_one();
    let green = Rgb::new(0.0, 1.0, 0.0).with_alpha_one();
    let scene = scene(layer(Vol::repeat(size3(2, 2, 2), 0.8), step_1d(0.1, red)))
        .with_secondary(layer(Vol::repeat(size3(2, 2, 2), 0.9), step_1d(0.1, green)));

    let mut options = options(RenderMode::Surface);
    options.threshold = 0.5;
    assert_eq!(march(&scene, &options).color, red);
    options.blend = MultiVolumeBlend::Overlay;
    assert_eq!(march(&scene, &options).color, green);
}

#[test]
fn isolate_hides_primary_outside_secondary() {
    let white = Rgba::WHITE;
    let mask = Vol::from_fn(size3(1, 1, 8), |p| if p.z >= 4 { 1.0 } else { 0.0 });
    let scene = scene(layer(Vol::repeat(size3(2, 2, 2), 0.8), step_1d(0.1, white)))
        .with_secondary(layer(mask, step_1d(0.1, white)));

    let mut options = options(RenderMode::Surface);
    options.threshold = 0.5;
    assert_eq!(march(&scene, &options).depth, Some(1.0));
    options.blend = MultiVolumeBlend::Isolate;
    let depth = march(&scene, &options).depth.unwrap();
    assert!((depth - 1.5).abs() < 0.01, "{depth}");
}

#[test]
fn shadow_darkens() {
    let vol = Vol::repeat(size3(4, 4, 4), 1.0);
    let density = DensityTexture::Single(vol.clone());
    let tf = TransferFunction::OneD(TransferFunction1D::constant(Rgba::WHITE));
    let shadow = ShadowVolume::compute(&density, None, &tf, vec3(0.0, 1.0, 0.0), 1);
    let scene = scene(layer(vol, TransferFunction1D::constant(Rgba::WHITE)))
        .with_shadow(Arc::new(shadow));

    let mut options = options(RenderMode::Surface);
    let unshadowed = march(&scene, &options).color;
    options.shadow.enabled = true;
    options.shadow.strength = 0.8;
    let shadowed = march(&scene, &options).color;

    assert_eq!(unshadowed, Rgba::WHITE);
    assert!((shadowed.red() - 0.2).abs() < 1e-3, "{shadowed:?}");
}
