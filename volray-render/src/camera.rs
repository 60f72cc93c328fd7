//! [`Camera`]: where rays come from.

use euclid::{Angle, Size2D};

use volray::VolumeTransform;
use volray::math::{FreeCoordinate, WorldPoint, WorldVector};

/// Unit-of-measure type for image pixels.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[expect(clippy::exhaustive_enums)]
pub enum ImagePixel {}

/// Dimensions of a rendered image.
pub type ImageSize = Size2D<u32, ImagePixel>;

/// How a [`Camera`] maps image positions to rays.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum Projection {
    /// Parallel rays, all in the viewing direction.
    Orthographic {
        /// Half the height of the visible region, in world units.
        half_height: FreeCoordinate,
    },
    /// Rays diverging from the eye.
    Perspective {
        /// Field of view from the bottom to the top edge of the image.
        fov_y: Angle<FreeCoordinate>,
    },
}

/// A viewpoint in world space, and the image it produces.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct Camera {
    /// How rays spread.
    pub projection: Projection,
    /// Position of the camera.
    pub eye: WorldPoint,
    /// Point at the center of the image.
    pub look_at: WorldPoint,
    /// Approximate upward direction of the image; need not be perpendicular to the view.
    pub up: WorldVector,
    /// Size of the image in pixels.
    pub image_size: ImageSize,
}

impl Camera {
    /// A camera at `eye` looking at `look_at` with +Y up.
    pub fn new(
        projection: Projection,
        eye: WorldPoint,
        look_at: WorldPoint,
        image_size: ImageSize,
    ) -> Self {
        Self {
            projection,
            eye,
            look_at,
            up: WorldVector::new(0.0, 1.0, 0.0),
            image_size,
        }
    }

    /// A camera looking at the center of the volume placed by `transform`, from the side
    /// given by `direction` (pointing from the volume toward the eye), far enough away to
    /// see all of it.
    pub fn framing(
        transform: &VolumeTransform,
        direction: WorldVector,
        projection: Projection,
        image_size: ImageSize,
    ) -> Self {
        let size = transform.physical_size();
        let radius = size.to_vector().length() / 2.0;
        let center = transform.translation().to_point();
        let direction = direction
            .try_normalize()
            .unwrap_or(WorldVector::new(0.0, 0.0, 1.0));
        let distance = match projection {
            Projection::Orthographic { .. } => radius * 2.0,
            Projection::Perspective { fov_y } => {
                radius / (fov_y.radians / 2.0).sin().max(1e-3)
            }
        };
        let projection = match projection {
            Projection::Orthographic { .. } => Projection::Orthographic {
                half_height: radius,
            },
            other => other,
        };
        let mut camera = Self::new(projection, center + direction * distance, center, image_size);
        if direction.cross(camera.up).square_length() < 1e-12 {
            camera.up = WorldVector::new(0.0, 0.0, 1.0);
        }
        camera
    }

    /// Width divided by height of the image.
    pub fn aspect_ratio(&self) -> FreeCoordinate {
        f64::from(self.image_size.width.max(1)) / f64::from(self.image_size.height.max(1))
    }

    /// Convert an *x* pixel coordinate to normalized device coordinates, range −1 to 1
    /// (at pixel centers).
    #[inline]
    pub fn normalize_x(&self, x: u32) -> FreeCoordinate {
        (f64::from(x) + 0.5) / f64::from(self.image_size.width.max(1)) * 2.0 - 1.0
    }

    /// Convert a *y* pixel coordinate to normalized device coordinates, range −1 to 1
    /// (at pixel centers) and flipped so that +1 is the top row.
    #[inline]
    pub fn normalize_y(&self, y: u32) -> FreeCoordinate {
        -((f64::from(y) + 0.5) / f64::from(self.image_size.height.max(1)) * 2.0 - 1.0)
    }

    /// Orthonormal `(forward, right, up)` vectors of the view.
    fn basis(&self) -> (WorldVector, WorldVector, WorldVector) {
        let forward = (self.look_at - self.eye)
            .try_normalize()
            .unwrap_or(WorldVector::new(0.0, 0.0, -1.0));
        let right = forward
            .cross(self.up)
            .try_normalize()
            .or_else(|| forward.cross(WorldVector::new(1.0, 0.0, 0.0)).try_normalize())
            .unwrap_or(WorldVector::new(1.0, 0.0, 0.0));
        let up = right.cross(forward);
        (forward, right, up)
    }

    /// Returns the origin and unit direction of the ray through the given point in
    /// normalized device coordinates.
    ///
    /// Distances along the ray are measured from the eye for perspective projection, and
    /// from the plane through the eye perpendicular to the view for orthographic.
    pub fn project_ndc_into_world(
        &self,
        ndc_x: FreeCoordinate,
        ndc_y: FreeCoordinate,
    ) -> (WorldPoint, WorldVector) {
        let (forward, right, up) = self.basis();
        let aspect = self.aspect_ratio();
        match self.projection {
            Projection::Orthographic { half_height } => (
                self.eye + right * (ndc_x * half_height * aspect) + up * (ndc_y * half_height),
                forward,
            ),
            Projection::Perspective { fov_y } => {
                let tan = (fov_y.radians / 2.0).tan();
                let direction = forward + right * (ndc_x * tan * aspect) + up * (ndc_y * tan);
                (self.eye, direction.normalize())
            }
        }
    }

    /// The ray through the center of pixel `(x, y)`.
    pub fn project_pixel_into_world(&self, x: u32, y: u32) -> (WorldPoint, WorldVector) {
        self.project_ndc_into_world(self.normalize_x(x), self.normalize_y(y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::{point3, size2, vec3};
    use volray::math::WorldSize;

    fn assert_close(a: WorldVector, b: WorldVector) {
        assert!((a - b).length() < 1e-9, "{a:?} != {b:?}");
    }

    #[test]
    fn center_pixel_looks_at_target() {
        for projection in [
            Projection::Orthographic { half_height: 2.0 },
            Projection::Perspective {
                fov_y: Angle::degrees(60.0),
            },
        ] {
            let camera = Camera::new(
                projection,
                point3(0.0, 0.0, 5.0),
                point3(0.0, 0.0, 0.0),
                size2(1, 1),
            );
            let (origin, direction) = camera.project_pixel_into_world(0, 0);
            assert_eq!(origin, point3(0.0, 0.0, 5.0));
            assert_close(direction, vec3(0.0, 0.0, -1.0));
        }
    }

    #[test]
    fn orthographic_rays_are_parallel() {
        let camera = Camera::new(
            Projection::Orthographic { half_height: 1.0 },
            point3(0.0, 0.0, 5.0),
            point3(0.0, 0.0, 0.0),
            size2(2, 2),
        );
        let (top_left, d1) = camera.project_pixel_into_world(0, 0);
        let (bottom_right, d2) = camera.project_pixel_into_world(1, 1);
        assert_close(d1, d2);
        assert_close(top_left - bottom_right, vec3(-1.0, 1.0, 0.0));
    }

    #[test]
    fn framing_sees_whole_volume() {
        let transform = VolumeTransform::new(WorldSize::new(2.0, 2.0, 2.0));
        let camera = Camera::framing(
            &transform,
            vec3(0.0, 1.0, 0.0),
            Projection::Orthographic { half_height: 1.0 },
            size2(10, 10),
        );
        assert_eq!(camera.look_at, point3(0.0, 0.0, 0.0));
        assert!(camera.eye.y > 3f64.sqrt());
        // Looking straight down requires a different up vector.
        let (_, direction) = camera.project_pixel_into_world(5, 5);
        assert!(direction.x.is_finite());
        assert_close(direction, vec3(0.0, -1.0, 0.0));
    }
}
