//! [`DensityArraySource`], the interface by which decoders hand density arrays to a
//! [`Dataset`](crate::Dataset).

use std::sync::Arc;

use crate::math::{GridSize, WorldSize};

/// Something that can provide the flat density arrays of a volume.
///
/// Implemented by directly-linked decoders; [`RawDensityArrays`] is the in-memory
/// implementation that every decoder can fall back to producing.
///
/// Arrays are flattened in X-major order: the sample at `(x, y, z)` is at index
/// `x + y·nx + z·nx·ny`.
pub trait DensityArraySource {
    /// Dimensions `(nx, ny, nz)` of the voxel grid.
    fn size(&self) -> GridSize;

    /// The first (or only) density channel.
    fn primary(&self) -> &[i32];

    /// The second density channel, if this is a dual-channel volume.
    fn secondary(&self) -> Option<&[i32]>;

    /// Physical extent of one voxel along each axis.
    fn voxel_spacing(&self) -> WorldSize;
}

/// Density arrays held in memory.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDensityArrays {
    size: GridSize,
    primary: Arc<[i32]>,
    secondary: Option<Arc<[i32]>>,
    voxel_spacing: WorldSize,
}

impl RawDensityArrays {
    /// Wraps a single-channel density array with unit voxel spacing.
    ///
    /// The array's length is not checked here; [`Dataset::new()`](crate::Dataset::new)
    /// reports any mismatch.
    pub fn new(size: GridSize, primary: impl Into<Arc<[i32]>>) -> Self {
        Self {
            size,
            primary: primary.into(),
            secondary: None,
            voxel_spacing: WorldSize::new(1.0, 1.0, 1.0),
        }
    }

    /// Adds a second density channel.
    #[must_use]
    pub fn with_secondary(mut self, secondary: impl Into<Arc<[i32]>>) -> Self {
        self.secondary = Some(secondary.into());
        self
    }

    /// Sets the physical extent of one voxel.
    #[must_use]
    pub fn with_voxel_spacing(mut self, voxel_spacing: WorldSize) -> Self {
        self.voxel_spacing = voxel_spacing;
        self
    }

    /// Fills a volume by evaluating `f` at every voxel.
    pub fn from_fn(size: GridSize, mut f: impl FnMut(u32, u32, u32) -> i32) -> Self {
        let volume = size.width as usize * size.height as usize * size.depth as usize;
        let mut data = Vec::with_capacity(volume);
        for z in 0..size.depth {
            for y in 0..size.height {
                for x in 0..size.width {
                    data.push(f(x, y, z));
                }
            }
        }
        Self::new(size, data)
    }
}

impl DensityArraySource for RawDensityArrays {
    fn size(&self) -> GridSize {
        self.size
    }

    fn primary(&self) -> &[i32] {
        &self.primary
    }

    fn secondary(&self) -> Option<&[i32]> {
        self.secondary.as_deref()
    }

    fn voxel_spacing(&self) -> WorldSize {
        self.voxel_spacing
    }
}

impl<T: DensityArraySource + ?Sized> DensityArraySource for &T {
    fn size(&self) -> GridSize {
        (**self).size()
    }
    fn primary(&self) -> &[i32] {
        (**self).primary()
    }
    fn secondary(&self) -> Option<&[i32]> {
        (**self).secondary()
    }
    fn voxel_spacing(&self) -> WorldSize {
        (**self).voxel_spacing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::size3;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_fn_is_x_major() {
        let arrays = RawDensityArrays::from_fn(size3(2, 2, 2), |x, y, z| {
            (x + 10 * y + 100 * z) as i32
        });
        assert_eq!(arrays.primary(), &[0, 1, 10, 11, 100, 101, 110, 111]);
        assert_eq!(arrays.secondary(), None);
        assert_eq!(arrays.voxel_spacing(), WorldSize::new(1.0, 1.0, 1.0));
    }
}
