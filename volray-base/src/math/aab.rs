use core::fmt;

use euclid::{Point3D, Size3D};

use crate::math::{FreeCoordinate, FreePoint, FreeVector, Local};
use crate::raycast::Ray;

/// Axis-Aligned Box data type, in a dataset's local cube space.
#[derive(Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aab {
    lower_bounds: FreePoint,
    upper_bounds: FreePoint,
}

impl Aab {
    /// The unit cube `[0, 1]³`, which is the extent of every dataset in its own local space.
    pub const UNIT_CUBE: Aab = Aab {
        lower_bounds: Point3D::new(0., 0., 0.),
        upper_bounds: Point3D::new(1., 1., 1.),
    };

    /// Constructs an [`Aab`] from individual coordinates.
    #[inline]
    #[track_caller]
    pub fn new(
        lx: FreeCoordinate,
        hx: FreeCoordinate,
        ly: FreeCoordinate,
        hy: FreeCoordinate,
        lz: FreeCoordinate,
        hz: FreeCoordinate,
    ) -> Self {
        Self::from_lower_upper(Point3D::new(lx, ly, lz), Point3D::new(hx, hy, hz))
    }

    /// Constructs an [`Aab`] from most-negative and most-positive corner points.
    ///
    /// Panics if the points are not in the proper order or if they are NaN.
    #[inline]
    #[track_caller]
    pub fn from_lower_upper(
        lower_bounds: impl Into<FreePoint>,
        upper_bounds: impl Into<FreePoint>,
    ) -> Self {
        let lower_bounds = lower_bounds.into();
        let upper_bounds = upper_bounds.into();
        match Self::checked_from_lower_upper(lower_bounds, upper_bounds) {
            Some(aab) => aab,
            None => panic!(
                "invalid AAB points that are misordered or NaN: \
                lower {lower_bounds:?} upper {upper_bounds:?}"
            ),
        }
    }

    /// Constructs an [`Aab`] from most-negative and most-positive corner points.
    ///
    /// Returns [`None`] if the points are not in the proper order or if they are NaN.
    #[inline]
    pub fn checked_from_lower_upper(
        lower_bounds: FreePoint,
        upper_bounds: FreePoint,
    ) -> Option<Self> {
        if lower_bounds.x <= upper_bounds.x
            && lower_bounds.y <= upper_bounds.y
            && lower_bounds.z <= upper_bounds.z
        {
            Some(Self {
                lower_bounds,
                upper_bounds,
            })
        } else {
            None
        }
    }

    /// Size of the box in each axis.
    #[inline]
    pub fn size(&self) -> Size3D<FreeCoordinate, Local> {
        Size3D::from(self.upper_bounds - self.lower_bounds)
    }

    /// The center of the enclosed volume.
    #[inline]
    pub fn center(&self) -> FreePoint {
        self.lower_bounds.lerp(self.upper_bounds, 0.5)
    }

    /// Length of the box's space diagonal; `√3` for [`Aab::UNIT_CUBE`].
    #[inline]
    pub fn diagonal_length(&self) -> FreeCoordinate {
        (self.upper_bounds - self.lower_bounds).length()
    }

    /// Returns whether this box includes the given point, with closed bounds on every
    /// face.
    #[inline]
    pub fn contains(&self, point: FreePoint) -> bool {
        (self.lower_bounds.x..=self.upper_bounds.x).contains(&point.x)
            && (self.lower_bounds.y..=self.upper_bounds.y).contains(&point.y)
            && (self.lower_bounds.z..=self.upper_bounds.z).contains(&point.z)
    }

    /// Intersects `ray` with this box using the slab method, returning the parametric
    /// interval `(t_near, t_far)` along the ray's direction vector.
    ///
    /// If the (infinite line of the) ray misses the box, `t_near > t_far`. Negative values
    /// mean the crossing lies behind the ray origin; clamping them is the caller's choice.
    /// Zero direction components are handled by IEEE infinities.
    #[inline]
    pub fn intersect_ray(&self, ray: &Ray) -> (FreeCoordinate, FreeCoordinate) {
        let inv = FreeVector::new(
            1.0 / ray.direction.x,
            1.0 / ray.direction.y,
            1.0 / ray.direction.z,
        );
        let t_lower = (self.lower_bounds - ray.origin).component_mul(inv);
        let t_upper = (self.upper_bounds - ray.origin).component_mul(inv);
        let t_min = t_lower.min(t_upper);
        let t_max = t_lower.max(t_upper);
        // `max`/`min` ignore NaN, which arises for an origin on a slab plane with a zero
        // direction component; the other axes then decide.
        let t_near = t_min.x.max(t_min.y).max(t_min.z);
        let t_far = t_max.x.min(t_max.y).min(t_max.z);
        (t_near, t_far)
    }
}

impl fmt::Debug for Aab {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Aab {
            lower_bounds: l,
            upper_bounds: u,
        } = *self;
        f.debug_tuple("Aab")
            .field(&(l.x..=u.x))
            .field(&(l.y..=u.y))
            .field(&(l.z..=u.z))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    #[should_panic = "invalid AAB points that are misordered or NaN: lower (1.0, 0.0, 0.0) upper (0.0, 1.0, 1.0)"]
    fn new_wrong_order() {
        let _ = Aab::new(1., 0., 0., 1., 0., 1.);
    }

    #[test]
    fn debug() {
        assert_eq!(
            format!("{:?}", Aab::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0)),
            "Aab(1.0..=2.0, 3.0..=4.0, 5.0..=6.0)"
        );
    }

    #[test]
    fn ray_through_center_from_outside() {
        let ray = Ray::new([0.5, 0.5, -2.0], [0.0, 0.0, 1.0]);
        let (near, far) = Aab::UNIT_CUBE.intersect_ray(&ray);
        assert_eq!((near, far), (2.0, 3.0));
        assert!(near < far && near >= 0.0 && far.is_finite());
    }

    #[test]
    fn diagonal_ray() {
        let ray = Ray::new([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]);
        let (near, far) = Aab::UNIT_CUBE.intersect_ray(&ray);
        assert_eq!((near, far), (1.0, 2.0));
    }

    #[test]
    fn ray_missing_cube() {
        let ray = Ray::new([2.0, 2.0, -2.0], [0.0, 0.0, 1.0]);
        let (near, far) = Aab::UNIT_CUBE.intersect_ray(&ray);
        assert!(near > far, "{near} should exceed {far}");
    }

    #[rstest::rstest]
    fn ray_from_inside(
        #[values([1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0])] direction: [f64; 3],
    ) {
        let ray = Ray::new([0.5, 0.5, 0.5], direction);
        let (near, far) = Aab::UNIT_CUBE.intersect_ray(&ray);
        assert_eq!((near, far), (-0.5, 0.5));
    }

    #[test]
    fn unit_cube_properties() {
        assert_eq!(Aab::UNIT_CUBE.diagonal_length(), 3f64.sqrt());
        assert_eq!(Aab::UNIT_CUBE.center(), Point3D::new(0.5, 0.5, 0.5));
        assert!(Aab::UNIT_CUBE.contains(Point3D::new(1.0, 0.0, 0.5)));
        assert!(!Aab::UNIT_CUBE.contains(Point3D::new(1.01, 0.0, 0.5)));
    }
}
