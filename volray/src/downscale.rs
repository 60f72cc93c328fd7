//! 2×2×2 box-average downscaling of density channels.

use euclid::size3;

use crate::math::{GridSize, Vol};
use crate::parallel;

/// Size of the result of [`halve()`]: each axis halved, rounding up.
pub(crate) fn halved_size(size: GridSize) -> GridSize {
    size3(
        size.width.div_ceil(2),
        size.height.div_ceil(2),
        size.depth.div_ceil(2),
    )
}

/// Halves the resolution of `source` on every axis by averaging each 2×2×2 block of
/// voxels into one.
///
/// On an odd-sized axis the last block is only one voxel thick there; its missing
/// neighbors are taken from the nearest voxel, which keeps uniform regions uniform.
/// Averages round to nearest, with ties rounding toward positive infinity.
pub(crate) fn halve(source: Vol<&[i32]>) -> Vol<Box<[i32]>> {
    let new_size = halved_size(source.size());
    let mut output =
        vec![0i32; new_size.width as usize * new_size.height as usize * new_size.depth as usize];

    let slice_len = new_size.width as usize * new_size.height as usize;
    parallel::map_z_slices(&mut output, slice_len, |z, slice| {
        let mut index = 0;
        for y in 0..new_size.height {
            for x in 0..new_size.width {
                let (x0, y0, z0) = (i64::from(x) * 2, i64::from(y) * 2, i64::from(z) * 2);
                let mut sum: i64 = 0;
                for dz in 0..2 {
                    for dy in 0..2 {
                        for dx in 0..2 {
                            sum += i64::from(*source.get_clamped(x0 + dx, y0 + dy, z0 + dz));
                        }
                    }
                }
                // The average of i32 values always fits in i32.
                slice[index] = (sum + 4).div_euclid(8) as i32;
                index += 1;
            }
        }
    });

    Vol::from_elements(new_size, output.into_boxed_slice())
        .unwrap_or_else(|_| unreachable!("output was allocated with the halved size"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn uniform_value_is_preserved_exactly() {
        for value in [0, 1, -1, 200, i32::MAX, i32::MIN] {
            let source = Vol::repeat(size3(5, 4, 3), value);
            let halved = halve(source.as_ref());
            assert_eq!(halved.size(), size3(3, 2, 2));
            assert!(halved.as_linear().iter().all(|&v| v == value), "{value}");
        }
    }

    #[test]
    fn block_average() {
        // One 2×2×2 block with values 0..8 averages to 3.5, rounded to 4.
        let source = Vol::from_fn(size3(2, 2, 2), |p| (p.x + 2 * p.y + 4 * p.z) as i32);
        let halved = halve(source.as_ref());
        assert_eq!(halved.as_linear(), &[4]);
    }

    #[test]
    fn odd_axis_uses_nearest_voxel() {
        let source = Vol::from_fn(size3(3, 1, 1), |p| [10, 20, 90][p.x as usize]);
        let halved = halve(source.as_ref());
        assert_eq!(halved.size(), size3(2, 1, 1));
        assert_eq!(halved.as_linear(), &[15, 90]);
    }

    #[test]
    fn halved_size_rounds_up() {
        assert_eq!(halved_size(size3(256, 255, 1)), size3(128, 128, 1));
    }
}
