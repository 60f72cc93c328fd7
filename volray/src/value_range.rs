//! Global value ranges of density channels, and histograms over them.

use core::fmt;

use crate::parallel;

/// The inclusive range of values found in a density channel.
///
/// A range whose minimum equals its maximum is *degenerate*. It is legal, and every
/// consumer treats its width as 1 so that normalization never divides by zero.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[expect(clippy::exhaustive_structs)]
pub struct ValueRange {
    /// Smallest value.
    pub min: i32,
    /// Largest value.
    pub max: i32,
}

impl ValueRange {
    /// Finds the minimum and maximum of `data` in one pass.
    ///
    /// Returns [`None`] if `data` is empty.
    ///
    /// ```
    /// use volray::value_range::ValueRange;
    ///
    /// assert_eq!(ValueRange::of(&[4, -2, 9]), Some(ValueRange { min: -2, max: 9 }));
    /// assert_eq!(ValueRange::of(&[]), None);
    /// ```
    pub fn of(data: &[i32]) -> Option<Self> {
        let (min, max) = parallel::min_max(data)?;
        Some(Self { min, max })
    }

    /// Whether the minimum equals the maximum.
    pub fn is_degenerate(self) -> bool {
        self.min == self.max
    }

    /// The width of the range, `max − min`, or 1 if the range is degenerate.
    pub fn range(self) -> f32 {
        if self.is_degenerate() {
            1.0
        } else {
            (i64::from(self.max) - i64::from(self.min)) as f32
        }
    }

    /// Maps `value` linearly so that `min` becomes 0 and `max` becomes 1.
    ///
    /// Values outside the range map outside `[0, 1]`; this does not clamp.
    pub fn normalize(self, value: i32) -> f32 {
        (i64::from(value) - i64::from(self.min)) as f32 / self.range()
    }

    /// Maps a normalized value back to the density scale; the inverse of
    /// [`ValueRange::normalize()`] for values within the range.
    pub fn denormalize(self, normalized: f32) -> f32 {
        self.min as f32 + normalized * self.range()
    }

    /// Whether `value` lies within the range.
    pub fn contains(self, value: i32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}

/// Counts the values of `data` falling in each of `bin_count` equal-width bins spanning
/// `range`.
///
/// Values outside `range` are counted in the first or last bin. If `range` is
/// degenerate, every value is counted in bin 0.
///
/// ```
/// use volray::value_range::{ValueRange, histogram};
///
/// let data = [0, 1, 2, 3, 4, 5, 6, 7];
/// let range = ValueRange::of(&data).unwrap();
/// assert_eq!(histogram(&data, range, 4), vec![2, 2, 2, 2]);
/// ```
pub fn histogram(data: &[i32], range: ValueRange, bin_count: usize) -> Vec<u64> {
    let mut bins = vec![0u64; bin_count];
    let Some(last_bin) = bin_count.checked_sub(1) else {
        return bins;
    };
    if range.is_degenerate() {
        bins[0] = data.len() as u64;
        return bins;
    }

    let width = i64::from(range.max) - i64::from(range.min);
    for &value in data {
        let offset = (i64::from(value) - i64::from(range.min)).clamp(0, width);
        // Integer arithmetic keeps bin boundaries exact; the maximum lands in the last bin.
        let bin = (offset as u128 * bin_count as u128 / width as u128) as usize;
        bins[bin.min(last_bin)] += 1;
    }
    bins
}
