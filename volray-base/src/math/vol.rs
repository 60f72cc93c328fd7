use core::fmt;
use core::ops::{Deref, DerefMut, Index, IndexMut};

use euclid::point3;

use crate::math::{GridPoint, GridSize, GridSizeCoord};

/// Type for volume data stored in a slice, or for generating linear indexing.
///
/// * `C` is some slice container type, e.g. `&[T]` or `Box<[T]>`.
///   It may also be `()` to describe a linearization without actually storing data.
///
/// Elements are stored in X-major order: linearly adjacent elements have adjacent X
/// coordinates, and the linear index of `(x, y, z)` is `x + y·nx + z·nx·ny`.
/// Consequently each Z slice is one contiguous run of `nx·ny` elements, which is what
/// slice-parallel algorithms split on.
///
/// In addition to the data, each [`Vol`] stores the [`GridSize`] defining its extent;
/// the container's length must be equal to the volume of that size.
///
/// A [`Vol`] whose volume exceeds [`usize::MAX`] cannot exist.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Vol<C> {
    /// Invariant: `size` has a volume that is at most [`usize::MAX`].
    size: GridSize,
    /// Invariant: `contents.deref().len()`, if it exists, equals the volume of `size`.
    contents: C,
}

impl Vol<()> {
    /// Constructs a dataless [`Vol`] which only describes the linearization of `size`.
    ///
    /// Returns a [`VolLengthError`] if the volume of `size` overflows `usize`.
    #[inline]
    pub fn new_dataless(size: GridSize) -> Result<Self, VolLengthError> {
        if checked_volume(size).is_none() {
            Err(VolLengthError {
                input_length: None,
                size,
            })
        } else {
            Ok(Self { size, contents: () })
        }
    }

    /// Attach some data to this dataless `Vol`.
    ///
    /// Returns a [`VolLengthError`] if the number of elements does not match the volume.
    #[allow(clippy::missing_inline_in_public_items, reason = "is generic already")]
    pub fn with_elements<C, V>(self, elements: C) -> Result<Vol<C>, VolLengthError>
    where
        C: Deref<Target = [V]>,
    {
        if elements.len() == self.volume() {
            Ok(Vol {
                size: self.size,
                contents: elements,
            })
        } else {
            Err(VolLengthError {
                input_length: Some(elements.len()),
                size: self.size,
            })
        }
    }
}

/// Constructors from linear containers.
impl<C, V> Vol<C>
where
    C: Deref<Target = [V]>,
{
    /// Constructs a `Vol<C>` containing the provided elements, which must be in X-major
    /// order.
    ///
    /// Returns a [`VolLengthError`] if the number of elements does not match the volume
    /// of `size`.
    #[allow(clippy::missing_inline_in_public_items, reason = "is generic already")]
    pub fn from_elements(size: GridSize, elements: impl Into<C>) -> Result<Self, VolLengthError> {
        Vol::new_dataless(size)?.with_elements(elements.into())
    }
}

/// Constructors from elements not already stored linearly.
#[allow(clippy::missing_inline_in_public_items, reason = "is generic already")]
impl<V> Vol<Box<[V]>> {
    /// Constructs a `Vol` by using the provided function to compute a value
    /// for each point.
    ///
    /// Panics if `size` has a volume exceeding `usize::MAX`.
    /// (But there will likely be a memory allocation failure well below that point.)
    pub fn from_fn<F>(size: GridSize, mut f: F) -> Self
    where
        F: FnMut(GridPoint) -> V,
    {
        let dataless = Vol::new_dataless(size).unwrap();
        let mut elements = Vec::with_capacity(dataless.volume());
        for z in 0..size.depth {
            for y in 0..size.height {
                for x in 0..size.width {
                    elements.push(f(point3(x, y, z)));
                }
            }
        }
        dataless.with_elements(elements.into_boxed_slice()).unwrap()
    }

    /// Constructs a `Vol` by cloning the provided value for each point.
    pub fn repeat(size: GridSize, value: V) -> Self
    where
        V: Clone,
    {
        Self::from_fn(size, |_| value.clone())
    }

    /// Returns the linear contents, discarding the size.
    pub fn into_elements(self) -> Box<[V]> {
        self.contents
    }
}

impl<C> Vol<C> {
    /// Returns the dimensions of this volume.
    #[inline]
    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Returns the volume, also known as the number of elements.
    #[inline]
    pub fn volume(&self) -> usize {
        // Cannot overflow due to the invariant.
        self.size.width as usize * self.size.height as usize * self.size.depth as usize
    }

    /// Number of elements in one Z slice, `nx·ny`.
    #[inline]
    pub fn slice_len(&self) -> usize {
        self.size.width as usize * self.size.height as usize
    }

    /// Returns the linear index of the given point, `x + y·nx + z·nx·ny`, or [`None`] if
    /// the point is out of bounds.
    #[inline]
    pub fn index(&self, point: impl Into<GridPoint>) -> Option<usize> {
        let point = point.into();
        let size = self.size;
        if point.x < size.width && point.y < size.height && point.z < size.depth {
            Some(self.index_unchecked(point.x, point.y, point.z))
        } else {
            None
        }
    }

    /// Linear index without bounds checking; the result is meaningless (but not unsafe to
    /// use, since slice indexing checks again) if the point is out of bounds.
    #[inline(always)]
    pub fn index_unchecked(&self, x: GridSizeCoord, y: GridSizeCoord, z: GridSizeCoord) -> usize {
        let nx = self.size.width as usize;
        let ny = self.size.height as usize;
        x as usize + y as usize * nx + z as usize * nx * ny
    }

    /// Linear index of the point nearest to the given possibly out-of-bounds coordinates,
    /// clamping each coordinate to the grid (no wraparound).
    #[inline]
    pub fn clamped_index(&self, x: i64, y: i64, z: i64) -> usize {
        let clamp = |v: i64, n: GridSizeCoord| v.clamp(0, i64::from(n) - 1) as GridSizeCoord;
        self.index_unchecked(
            clamp(x, self.size.width),
            clamp(y, self.size.height),
            clamp(z, self.size.depth),
        )
    }

    /// Converts a linear index back to the point it denotes.
    #[inline]
    pub fn point_of(&self, index: usize) -> GridPoint {
        let nx = self.size.width as usize;
        let ny = self.size.height as usize;
        point3(
            (index % nx) as GridSizeCoord,
            ((index / nx) % ny) as GridSizeCoord,
            (index / (nx * ny)) as GridSizeCoord,
        )
    }

    /// Returns a dataless [`Vol`] with the same size as this one.
    #[inline]
    pub fn without_elements(&self) -> Vol<()> {
        Vol {
            size: self.size,
            contents: (),
        }
    }
}

impl<C, V> Vol<C>
where
    C: Deref<Target = [V]>,
{
    /// Return a [`Vol`] that borrows the contents of this one.
    #[inline]
    pub fn as_ref(&self) -> Vol<&[V]> {
        Vol {
            size: self.size,
            contents: self.as_linear(),
        }
    }

    /// Returns the elements of this volume in X-major order.
    #[inline]
    pub fn as_linear(&self) -> &[V] {
        let s = &*self.contents;
        debug_assert_eq!(s.len(), self.volume());
        s
    }

    /// Returns the element at `point`, or [`None`] if it is out of bounds.
    #[inline]
    pub fn get(&self, point: impl Into<GridPoint>) -> Option<&V> {
        let index = self.index(point)?;
        self.as_linear().get(index)
    }

    /// Returns the element nearest to the given possibly out-of-bounds coordinates.
    #[inline]
    pub fn get_clamped(&self, x: i64, y: i64, z: i64) -> &V {
        &self.as_linear()[self.clamped_index(x, y, z)]
    }

    /// Returns the contiguous run of elements making up Z slice `z`.
    ///
    /// Panics if `z` is out of bounds.
    #[inline]
    pub fn z_slice(&self, z: GridSizeCoord) -> &[V] {
        let len = self.slice_len();
        let start = z as usize * len;
        &self.as_linear()[start..start + len]
    }

    /// Apply `f` to each element and return a [`Vol`] of the results, with the same size.
    #[allow(clippy::missing_inline_in_public_items, reason = "is generic already")]
    pub fn map<T, F>(&self, f: F) -> Vol<Box<[T]>>
    where
        F: FnMut(&V) -> T,
    {
        Vol {
            size: self.size,
            contents: self.as_linear().iter().map(f).collect(),
        }
    }
}

impl<C, V> Vol<C>
where
    C: DerefMut<Target = [V]>,
{
    /// Returns the mutable elements of this volume in X-major order.
    #[inline]
    pub fn as_linear_mut(&mut self) -> &mut [V] {
        let s = &mut *self.contents;
        debug_assert_eq!(
            s.len(),
            self.size.width as usize * self.size.height as usize * self.size.depth as usize
        );
        s
    }

    /// Returns a mutable reference to the element at `point`, or [`None`] if it is out of
    /// bounds.
    #[inline]
    pub fn get_mut(&mut self, point: impl Into<GridPoint>) -> Option<&mut V> {
        let index = self.index(point)?;
        self.as_linear_mut().get_mut(index)
    }
}

impl<P: Into<GridPoint>, C: Deref<Target = [V]>, V> Index<P> for Vol<C> {
    type Output = V;

    /// Returns the element at `point` of this volume data.
    ///
    /// Panics if `point` is out of the bounds of this volume.
    #[inline(always)]
    fn index(&self, point: P) -> &Self::Output {
        let point: GridPoint = point.into();
        if let Some(index) = Vol::index(self, point) {
            &self.contents[index]
        } else {
            panic!(
                "position {point:?} out of Vol size {size:?}",
                size = self.size
            )
        }
    }
}

impl<P: Into<GridPoint>, C: DerefMut<Target = [V]>, V> IndexMut<P> for Vol<C> {
    #[inline(always)]
    fn index_mut(&mut self, point: P) -> &mut Self::Output {
        let point: GridPoint = point.into();
        if let Some(index) = Vol::index(self, point) {
            &mut self.contents[index]
        } else {
            panic!(
                "position {point:?} out of Vol size {size:?}",
                size = self.size
            )
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for Vol<C> {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { size, contents } = self;
        // Print the size compactly; the contents may be huge, so leave them to the
        // alternate form.
        let alternate = f.alternate();
        let mut ds = f.debug_struct("Vol");
        ds.field(
            "size",
            &format_args!("{}×{}×{}", size.width, size.height, size.depth),
        );
        if alternate {
            ds.field("contents", contents);
            ds.finish()
        } else {
            ds.finish_non_exhaustive()
        }
    }
}

fn checked_volume(size: GridSize) -> Option<usize> {
    usize::try_from(size.width)
        .ok()?
        .checked_mul(usize::try_from(size.height).ok()?)?
        .checked_mul(usize::try_from(size.depth).ok()?)
}

/// Error from [`Vol::from_elements()`] and similar when the provided data would not
/// exactly fill the size.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VolLengthError {
    input_length: Option<usize>,
    size: GridSize,
}

impl std::error::Error for VolLengthError {}

impl fmt::Display for VolLengthError {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { input_length, size } = *self;
        let (w, h, d) = (size.width, size.height, size.depth);
        match (input_length, checked_volume(size)) {
            (Some(input_length), Some(volume)) => write!(
                f,
                "data of length {input_length} cannot fill volume {volume} of size {w}×{h}×{d}",
            ),

            (Some(input_length), None) => write!(
                f,
                "data of length {input_length} cannot fill size {w}×{h}×{d}, \
                    whose volume overflows usize",
            ),
            (None, None) => write!(f, "size {w}×{h}×{d} has a volume that overflows usize"),
            (None, Some(volume)) => write!(
                f,
                "size {w}×{h}×{d} has a volume {volume} that is somehow erroneous",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::size3;
    use pretty_assertions::assert_eq;

    #[test]
    fn x_major_linear_order() {
        let vol = Vol::from_fn(size3(3, 2, 2), |p| [p.x, p.y, p.z]);
        assert_eq!(
            vol.as_linear()[..7],
            [
                [0, 0, 0],
                [1, 0, 0],
                [2, 0, 0],
                [0, 1, 0],
                [1, 1, 0],
                [2, 1, 0],
                [0, 0, 1],
            ]
        );
    }

    #[test]
    fn index_function_matches_formula() {
        let vol = Vol::new_dataless(size3(5, 7, 3)).unwrap();
        assert_eq!(vol.index([4, 6, 2]), Some(4 + 6 * 5 + 2 * 5 * 7));
        assert_eq!(vol.index([5, 0, 0]), None);
        assert_eq!(vol.point_of(4 + 6 * 5 + 2 * 5 * 7), point3(4, 6, 2));
    }

    #[test]
    fn clamped_access_does_not_wrap() {
        let vol = Vol::from_fn(size3(4, 1, 1), |p| p.x);
        assert_eq!(*vol.get_clamped(-1, 0, 0), 0);
        assert_eq!(*vol.get_clamped(4, 0, 0), 3);
        assert_eq!(*vol.get_clamped(2, -5, 9), 2);
    }

    #[test]
    fn z_slice_is_contiguous() {
        let vol = Vol::from_fn(size3(2, 2, 3), |p| p.z);
        assert_eq!(vol.z_slice(1), &[1, 1, 1, 1]);
    }

    #[test]
    fn from_elements_error() {
        let error = Vol::<Box<[u8]>>::from_elements(size3(2, 2, 2), vec![0u8; 7]).unwrap_err();
        assert_eq!(
            error.to_string(),
            "data of length 7 cannot fill volume 8 of size 2×2×2"
        );
    }

    #[test]
    fn debug_is_compact() {
        let vol = Vol::repeat(size3(2, 3, 4), 0u8);
        assert_eq!(format!("{vol:?}"), "Vol { size: 2×3×4, .. }");
        let small = Vol::repeat(size3(2, 1, 1), 7u8);
        assert!(format!("{small:#?}").contains("contents: [\n        7,\n        7,\n    ],"));
    }
}
