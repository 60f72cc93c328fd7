//! [`VolumeRenderer`]: whole-image rendering.

use volray::math::{FreeCoordinate, Rgba};

use crate::camera::{Camera, ImageSize};
use crate::raymarch::march_ray;
use crate::scene::VolumeScene;
use crate::{RaymarchInfo, RenderOptions};

/// Renders images of a [`VolumeScene`] as seen by a [`Camera`].
///
/// Every pixel is an independent [`march_ray`] call; with the `auto-threads` feature, rows
/// and pixels are distributed over [`rayon`]'s global thread pool.
#[derive(Clone, Debug)]
pub struct VolumeRenderer {
    camera: Camera,
}

impl VolumeRenderer {
    /// Constructs a renderer with the given camera.
    pub fn new(camera: Camera) -> Self {
        Self { camera }
    }

    /// The current camera.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Replaces the camera.
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    /// Renders a full image.
    ///
    /// `options` are [repaired](RenderOptions::repair) before use.
    pub fn render(&self, scene: &VolumeScene, options: &RenderOptions) -> RenderedImage {
        let options = options.clone().repair();
        let size = self.camera.image_size;
        let area = size.width as usize * size.height as usize;
        let mut pixels = vec![(Rgba::TRANSPARENT, f32::INFINITY); area];
        let info = trace_image::trace_image_impl(self, scene, &options, &mut pixels);
        let (color, depth) = pixels.into_iter().unzip();
        log::trace!("rendered {}×{} image: {info:?}", size.width, size.height);
        RenderedImage {
            size,
            color,
            depth,
            info,
        }
    }

    /// Computes the color and world-space depth of one pixel. `options` must already be
    /// repaired.
    pub(crate) fn trace_pixel(
        &self,
        scene: &VolumeScene,
        options: &RenderOptions,
        x: u32,
        y: u32,
    ) -> (Rgba, f32, RaymarchInfo) {
        let (origin, direction) = self.camera.project_pixel_into_world(x, y);
        let transform = scene.transform();
        let local = transform.world_ray_to_local(origin, direction);
        // Length of the local direction per world unit; the local ray is normalized, so
        // local parameters are world distances multiplied by this.
        let scale = local.direction.length();
        if !(scale > 0.0 && scale.is_finite()) {
            return (
                Rgba::TRANSPARENT,
                f32::INFINITY,
                RaymarchInfo {
                    rays: 1,
                    ..RaymarchInfo::default()
                },
            );
        }
        let far: FreeCoordinate = options.view_distance * scale;
        let jitter = scene.jitter_tile().at(x as usize, y as usize);
        let outcome = march_ray(
            scene,
            options,
            local.normalize_direction(),
            far,
            jitter,
        );
        let depth = outcome
            .depth
            .map_or(f32::INFINITY, |t| (t / scale) as f32);
        (outcome.color, depth, outcome.info)
    }
}

/// Output of [`VolumeRenderer::render()`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct RenderedImage {
    /// Dimensions of the image.
    pub size: ImageSize,
    /// Colors, not premultiplied, in left-right then top-bottom raster order.
    pub color: Vec<Rgba>,
    /// Distance from the camera to the depth sample of each pixel, in world units;
    /// infinite where nothing was hit.
    pub depth: Vec<f32>,
    /// Statistics summed over all pixels.
    pub info: RaymarchInfo,
}

impl RenderedImage {
    /// Returns the color of pixel `(x, y)`.
    ///
    /// Panics if out of bounds.
    #[track_caller]
    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        self.color[self.index(x, y)]
    }

    /// Returns the depth of pixel `(x, y)`.
    ///
    /// Panics if out of bounds.
    #[track_caller]
    pub fn depth_at(&self, x: u32, y: u32) -> f32 {
        self.depth[self.index(x, y)]
    }

    #[track_caller]
    fn index(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.size.width && y < self.size.height,
            "pixel ({x}, {y}) out of bounds of {}×{} image",
            self.size.width,
            self.size.height
        );
        x as usize + y as usize * self.size.width as usize
    }

    /// Converts the image to 8-bit sRGB RGBA, in raster order.
    pub fn to_srgb8(&self) -> Vec<[u8; 4]> {
        self.color.iter().map(|c| c.to_srgb8()).collect()
    }
}

mod trace_image {
    use super::*;

    /// Compute a full image, writing it into `output`, whose length must be the area of
    /// the camera's image size.
    #[cfg(feature = "auto-threads")]
    pub(super) fn trace_image_impl(
        renderer: &VolumeRenderer,
        scene: &VolumeScene,
        options: &RenderOptions,
        output: &mut [(Rgba, f32)],
    ) -> RaymarchInfo {
        use rayon::iter::{
            IndexedParallelIterator as _, IntoParallelIterator as _, ParallelIterator as _,
        };
        use rayon::slice::ParallelSliceMut as _;

        let width = renderer.camera.image_size.width as usize;

        // max(1) protects against a zero-width image, which has zero chunks anyway.
        output
            .par_chunks_mut(width.max(1))
            .enumerate()
            .map(move |(y, raster_row)| {
                raster_row
                    .into_par_iter()
                    .enumerate()
                    .map(move |(x, pixel_out)| {
                        let (color, depth, info) =
                            renderer.trace_pixel(scene, options, x as u32, y as u32);
                        *pixel_out = (color, depth);
                        info
                    })
            })
            .flatten()
            .sum()
    }

    /// Compute a full image, writing it into `output`, whose length must be the area of
    /// the camera's image size.
    #[cfg(not(feature = "auto-threads"))]
    pub(super) fn trace_image_impl(
        renderer: &VolumeRenderer,
        scene: &VolumeScene,
        options: &RenderOptions,
        output: &mut [(Rgba, f32)],
    ) -> RaymarchInfo {
        let size = renderer.camera.image_size;

        let mut total_info = RaymarchInfo::default();
        let mut index = 0;
        for y in 0..size.height {
            for x in 0..size.width {
                let (color, depth, info) = renderer.trace_pixel(scene, options, x, y);
                output[index] = (color, depth);
                total_info += info;
                index += 1;
            }
        }
        total_info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Projection;
    use crate::scene::VolumeLayer;
    use crate::transfer::TransferFunction1D;
    use crate::TransferFunction;
    use euclid::{point3, size2, size3};
    use std::sync::Arc;
    use volray::VolumeTransform;
    use volray::math::{Rgb, Vol, WorldSize};
    use volray::resource::DensityTexture;

    fn solid_scene() -> VolumeScene {
        let layer = VolumeLayer::new(
            Arc::new(DensityTexture::Single(Vol::repeat(size3(4, 4, 4), 1.0))),
            None,
            TransferFunction::OneD(TransferFunction1D::constant(
                Rgb::new(0.0, 0.0, 1.0).with_alpha_one(),
            )),
        )
        .unwrap();
        VolumeScene::new(VolumeTransform::new(WorldSize::new(2.0, 2.0, 2.0)), layer)
    }

    #[test]
    fn image_layout_and_miss() {
        // The image is 4 world units wide; the outer columns miss the 2-unit cube.
        let camera = Camera::new(
            Projection::Orthographic { half_height: 1.0 },
            point3(0.0, 0.0, 10.0),
            point3(0.0, 0.0, 0.0),
            size2(8, 4),
        );
        let image = VolumeRenderer::new(camera).render(&solid_scene(), &RenderOptions::exact());
        assert_eq!(image.color.len(), 32);
        assert_eq!(image.info.rays, 32);
        assert_eq!(image.info.rays_hit, 16);

        assert_eq!(image.pixel(0, 0), Rgba::TRANSPARENT);
        assert_eq!(image.depth_at(0, 0), f32::INFINITY);
        assert_eq!(image.pixel(4, 2), Rgb::new(0.0, 0.0, 1.0).with_alpha_one());
        // Opaque at the first sample, which is on the front face, 9 units from the eye.
        assert!((image.depth_at(4, 2) - 9.0).abs() < 1e-4, "{}", image.depth_at(4, 2));
        assert_eq!(image.to_srgb8()[4 + 2 * 8], [0, 0, 255, 255]);
    }

    #[test]
    fn nonsense_options_are_repaired() {
        let camera = Camera::new(
            Projection::Orthographic { half_height: 1.0 },
            point3(0.0, 0.0, 10.0),
            point3(0.0, 0.0, 0.0),
            size2(1, 1),
        );
        let mut options = RenderOptions::exact();
        options.intensity = f32::NAN;
        options.max_steps = 0;
        let image = VolumeRenderer::new(camera).render(&solid_scene(), &options);
        assert_eq!(image.pixel(0, 0), Rgb::new(0.0, 0.0, 1.0).with_alpha_one());
    }

    #[test]
    fn view_distance_cuts_off() {
        let camera = Camera::new(
            Projection::Perspective {
                fov_y: euclid::Angle::degrees(30.0),
            },
            point3(0.0, 0.0, 10.0),
            point3(0.0, 0.0, 0.0),
            size2(1, 1),
        );
        let mut options = RenderOptions::exact();
        options.view_distance = 5.0;
        let options = options.repair();
        let renderer = VolumeRenderer::new(camera);
        let (color, depth, _) = renderer.trace_pixel(&solid_scene(), &options, 0, 0);
        assert_eq!(color, Rgba::TRANSPARENT);
        assert_eq!(depth, f32::INFINITY);
    }
}
