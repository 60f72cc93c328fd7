//! Numeric types used for coordinates and related quantities.

use euclid::{Point3D, Size3D, Vector3D};

/// Unit-of-measure type for the voxel grid of a dataset.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[expect(clippy::exhaustive_enums)]
pub enum Voxel {}

/// Unit-of-measure type for a dataset's local cube space, in which the whole dataset
/// occupies `[0, 1]³` regardless of its voxel dimensions.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[expect(clippy::exhaustive_enums)]
pub enum Local {}

/// Unit-of-measure type for world space, in which cameras are placed and datasets have
/// their physical size.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[expect(clippy::exhaustive_enums)]
pub enum World {}

/// Numeric type in a [`GridSize`] or [`GridPoint`].
pub type GridSizeCoord = u32;

/// Positions of voxels in a dataset's grid.
pub type GridPoint = Point3D<GridSizeCoord, Voxel>;

/// Dimensions `(nx, ny, nz)` of a voxel grid.
pub type GridSize = Size3D<GridSizeCoord, Voxel>;

/// Coordinates that are not locked to the voxel grid.
pub type FreeCoordinate = f64;

/// Positions in local cube space.
pub type FreePoint = Point3D<FreeCoordinate, Local>;

/// Vectors in local cube space.
pub type FreeVector = Vector3D<FreeCoordinate, Local>;

/// Positions in world space.
pub type WorldPoint = Point3D<FreeCoordinate, World>;

/// Vectors in world space.
pub type WorldVector = Vector3D<FreeCoordinate, World>;

/// Extents in world space, such as a dataset's physical size or its voxel spacing.
pub type WorldSize = Size3D<FreeCoordinate, World>;

/// Returns the largest of the three dimensions of `size`.
#[inline]
pub fn max_dimension(size: GridSize) -> GridSizeCoord {
    size.width.max(size.height).max(size.depth)
}
