//! Rays in a dataset's local cube space.

use crate::math::{FreeCoordinate, FreePoint, FreeVector};

/// A ray; a half-infinite line segment (sometimes used as finite by the length of the
/// direction vector).
#[allow(clippy::exhaustive_structs)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    /// The sole endpoint of the ray.
    pub origin: FreePoint,

    /// The direction in which the ray extends infinitely.
    ///
    /// The meaning, if any, of the magnitude of this vector depends on context;
    /// considered as a geometric object it is a parameter.
    pub direction: FreeVector,
}

impl Ray {
    /// Constructs a [`Ray`] from convertible types (e.g. tuples or 3-element arrays).
    /// Other than the use of [`Into`], this is equivalent to a struct literal.
    ///
    /// ```
    /// use volray_base::euclid::{point3, vec3};
    /// use volray_base::raycast::Ray;
    ///
    /// assert_eq!(
    ///     Ray::new([1., 2., 3.], [4., 5., 6.]),
    ///     Ray {
    ///         origin: point3(1., 2., 3.),
    ///         direction: vec3(4., 5., 6.),
    ///     }
    /// );
    /// ```
    #[allow(clippy::missing_inline_in_public_items)] // is generic already
    pub fn new(origin: impl Into<FreePoint>, direction: impl Into<FreeVector>) -> Self {
        Self {
            origin: origin.into(),
            direction: direction.into(),
        }
    }

    /// Returns the point at parameter `t`, `origin + direction × t`.
    #[must_use]
    #[inline]
    pub fn at(self, t: FreeCoordinate) -> FreePoint {
        self.origin + self.direction * t
    }

    /// Moves the origin forward by `t` units of the direction vector.
    #[must_use]
    #[inline]
    pub fn advance(self, t: FreeCoordinate) -> Self {
        Self {
            origin: self.at(t),
            direction: self.direction,
        }
    }

    /// Returns the ray with its direction scaled to unit length.
    /// A zero direction is left unchanged.
    #[must_use]
    #[inline]
    pub fn normalize_direction(self) -> Self {
        let length = self.direction.length();
        if length > 0.0 {
            Self {
                origin: self.origin,
                direction: self.direction / length,
            }
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::point3;
    use pretty_assertions::assert_eq;

    #[test]
    fn at_and_advance() {
        let ray = Ray::new([1., 0., 0.], [0., 2., 0.]);
        assert_eq!(ray.at(1.5), point3(1., 3., 0.));
        assert_eq!(ray.advance(1.5).origin, point3(1., 3., 0.));
    }

    #[test]
    fn normalize() {
        let ray = Ray::new([0., 0., 0.], [0., 0., 4.]).normalize_direction();
        assert_eq!(ray.direction.length(), 1.0);
        let zero = Ray::new([0., 0., 0.], [0., 0., 0.]);
        assert_eq!(zero.normalize_direction(), zero);
    }
}
