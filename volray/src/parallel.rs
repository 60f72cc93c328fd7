//! Helpers which run slice-wise work on rayon’s thread pool when the `auto-threads`
//! feature is enabled, and sequentially otherwise, with identical results.

#[cfg(feature = "auto-threads")]
use rayon::iter::{
    IndexedParallelIterator as _, IntoParallelRefIterator as _, ParallelIterator as _,
};
#[cfg(feature = "auto-threads")]
use rayon::slice::ParallelSliceMut as _;

/// Splits `output` into consecutive chunks of `slice_len` elements (one Z slice each) and
/// calls `f(z, chunk)` on each, returning the per-slice results in Z order.
///
/// Each call may write only its own chunk; anything shared must go through `f`'s captures
/// by shared reference.
pub(crate) fn map_z_slices<T, R, F>(output: &mut [T], slice_len: usize, f: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(u32, &mut [T]) -> R + Sync + Send,
{
    let slice_len = slice_len.max(1);

    #[cfg(feature = "auto-threads")]
    {
        output
            .par_chunks_mut(slice_len)
            .enumerate()
            .map(|(z, chunk)| f(z as u32, chunk))
            .collect()
    }

    #[cfg(not(feature = "auto-threads"))]
    {
        output
            .chunks_mut(slice_len)
            .enumerate()
            .map(|(z, chunk)| f(z as u32, chunk))
            .collect()
    }
}

/// Applies `f` to every element of `input`, collecting the results in order.
pub(crate) fn map_elements<T, U, F>(input: &[T], f: F) -> Box<[U]>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    #[cfg(feature = "auto-threads")]
    {
        input.par_iter().map(f).collect::<Vec<U>>().into_boxed_slice()
    }

    #[cfg(not(feature = "auto-threads"))]
    {
        input.iter().map(f).collect()
    }
}

/// Finds the minimum and maximum of a non-empty slice.
pub(crate) fn min_max(input: &[i32]) -> Option<(i32, i32)> {
    if input.is_empty() {
        return None;
    }
    let identity = || (i32::MAX, i32::MIN);
    let step = |(lo, hi): (i32, i32), v: i32| (lo.min(v), hi.max(v));

    #[cfg(feature = "auto-threads")]
    let result = input
        .par_iter()
        .fold(identity, |acc, &v| step(acc, v))
        .reduce(identity, |a, b| (a.0.min(b.0), a.1.max(b.1)));

    #[cfg(not(feature = "auto-threads"))]
    let result = input.iter().fold(identity(), |acc, &v| step(acc, v));

    Some(result)
}
