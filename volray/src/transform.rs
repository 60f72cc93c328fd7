//! Placement of a dataset's local cube in world space.

use euclid::Rotation3D;

use crate::math::{FreePoint, FreeVector, World, WorldPoint, WorldSize, WorldVector};
use crate::raycast::Ray;

/// Maps a dataset's local cube space, `[0, 1]³`, to world space and back.
///
/// The cube is scaled to the dataset's physical size, centered on the origin, rotated, and
/// then translated. The mapping is affine, so a ray keeps its parametrization: the point at
/// parameter `t` of a world-space ray maps to the point at `t` of the local-space ray.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VolumeTransform {
    physical_size: WorldSize,
    rotation: Rotation3D<f64, World, World>,
    translation: WorldVector,
}

impl VolumeTransform {
    /// A transform that only scales the cube to `physical_size`, centered on the origin.
    pub fn new(physical_size: WorldSize) -> Self {
        Self {
            physical_size,
            rotation: Rotation3D::identity(),
            translation: WorldVector::zero(),
        }
    }

    /// Extent of the cube in world units.
    pub fn physical_size(&self) -> WorldSize {
        self.physical_size
    }

    /// Orientation of the cube.
    pub fn rotation(&self) -> Rotation3D<f64, World, World> {
        self.rotation
    }

    /// World position of the cube's center.
    pub fn translation(&self) -> WorldVector {
        self.translation
    }

    /// Replaces the orientation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Rotation3D<f64, World, World>) -> Self {
        self.rotation = rotation;
        self
    }

    /// Replaces the position of the cube's center.
    #[must_use]
    pub fn with_translation(mut self, translation: WorldVector) -> Self {
        self.translation = translation;
        self
    }

    pub(crate) fn with_physical_size(mut self, physical_size: WorldSize) -> Self {
        self.physical_size = physical_size;
        self
    }

    /// Maps a point in local cube space to world space.
    pub fn local_to_world(&self, p: FreePoint) -> WorldPoint {
        let centered = (p - FreePoint::new(0.5, 0.5, 0.5))
            .cast_unit::<World>()
            .component_mul(self.physical_size.to_vector());
        self.rotation.transform_vector3d(centered).to_point() + self.translation
    }

    /// Maps a point in world space to local cube space.
    pub fn world_to_local(&self, p: WorldPoint) -> FreePoint {
        let centered = self.world_vector_to_local(p.to_vector() - self.translation);
        FreePoint::new(0.5, 0.5, 0.5) + centered
    }

    /// Maps a direction (or displacement) in world space to local cube space.
    pub fn world_vector_to_local(&self, v: WorldVector) -> FreeVector {
        let unrotated = self.rotation.inverse().transform_vector3d(v);
        let size = self.physical_size;
        FreeVector::new(
            unrotated.x / size.width,
            unrotated.y / size.height,
            unrotated.z / size.depth,
        )
    }

    /// Maps a world-space ray (origin and direction) into local cube space, preserving its
    /// parametrization.
    pub fn world_ray_to_local(&self, origin: WorldPoint, direction: WorldVector) -> Ray {
        Ray {
            origin: self.world_to_local(origin),
            direction: self.world_vector_to_local(direction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::{Angle, point3, vec3};

    fn assert_close(a: FreePoint, b: FreePoint) {
        assert!((a - b).length() < 1e-9, "{a:?} != {b:?}");
    }

    #[test]
    fn round_trip() {
        let transform = VolumeTransform::new(WorldSize::new(2.0, 4.0, 8.0))
            .with_rotation(Rotation3D::around_axis(vec3(1.0, 1.0, 0.0), Angle::degrees(30.0)))
            .with_translation(vec3(5.0, -1.0, 2.0));
        for p in [point3(0.0, 0.0, 0.0), point3(1.0, 0.5, 0.25), point3(0.3, 0.9, 1.0)] {
            assert_close(transform.world_to_local(transform.local_to_world(p)), p);
        }
    }

    #[test]
    fn center_is_translation() {
        let transform = VolumeTransform::new(WorldSize::new(3.0, 3.0, 3.0))
            .with_translation(vec3(1.0, 2.0, 3.0));
        assert_eq!(
            transform.local_to_world(point3(0.5, 0.5, 0.5)),
            point3(1.0, 2.0, 3.0)
        );
        assert_eq!(
            transform.local_to_world(point3(1.0, 1.0, 1.0)),
            point3(2.5, 3.5, 4.5)
        );
    }

    #[test]
    fn ray_parametrization_is_preserved() {
        let transform = VolumeTransform::new(WorldSize::new(2.0, 1.0, 4.0))
            .with_rotation(Rotation3D::around_axis(vec3(0.0, 1.0, 0.0), Angle::degrees(90.0)));
        let origin = point3(0.0, 0.0, -10.0);
        let direction = vec3(0.1, 0.0, 1.0);
        let local = transform.world_ray_to_local(origin, direction);
        for t in [0.0, 3.0, 10.0] {
            assert_close(local.at(t), transform.world_to_local(origin + direction * t));
        }
    }
}
