//! Transfer functions: mappings from normalized density (and gradient magnitude) to
//! color and opacity.

use core::fmt;
use std::sync::Arc;

use volray::math::{Rgb, Rgba};

/// Number of entries in a [`TransferFunction1D`] table, and along each axis of a
/// [`TransferFunction2D`] table.
pub const TABLE_SIZE: usize = 256;

// -------------------------------------------------------------------------------------------------

/// A lookup table from normalized density in `[0, 1]` to color and opacity.
#[derive(Clone, PartialEq)]
pub struct TransferFunction1D {
    table: Arc<[Rgba]>,
}

impl TransferFunction1D {
    /// Builds the table by evaluating `f` at the center of each of the [`TABLE_SIZE`]
    /// entries.
    pub fn from_fn(mut f: impl FnMut(f32) -> Rgba) -> Self {
        Self {
            table: (0..TABLE_SIZE).map(|i| f(entry_center(i))).collect(),
        }
    }

    /// Every density maps to `color`.
    pub fn constant(color: Rgba) -> Self {
        Self::from_fn(|_| color)
    }

    /// Piecewise-linear interpolation between control points given as
    /// `(density, color)` pairs. Densities outside the control points take the color of
    /// the nearest one. Returns [`None`] if `points` is empty.
    ///
    /// The points need not be sorted.
    pub fn from_control_points(points: &[(f32, Rgba)]) -> Option<Self> {
        let mut points = points.to_vec();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        let &(first_d, first_color) = points.first()?;
        let &(last_d, last_color) = points.last()?;
        Some(Self::from_fn(|d| {
            if d <= first_d {
                return first_color;
            }
            if d >= last_d {
                return last_color;
            }
            let upper = points.partition_point(|&(pd, _)| pd <= d);
            let (d0, c0) = points[upper - 1];
            let (d1, c1) = points[upper];
            let t = if d1 > d0 { (d - d0) / (d1 - d0) } else { 0.0 };
            lerp_rgba(c0, c1, t)
        }))
    }

    /// Maps `density` in `[0, 1]` (clamped) to a color.
    #[inline]
    pub fn lookup(&self, density: f32) -> Rgba {
        self.table[table_index(density)]
    }

    /// The table entries, in order of increasing density.
    pub fn table(&self) -> &[Rgba] {
        &self.table
    }
}

impl fmt::Debug for TransferFunction1D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Show a few samples rather than 256 entries.
        f.debug_struct("TransferFunction1D")
            .field("at_0", &self.lookup(0.0))
            .field("at_0.5", &self.lookup(0.5))
            .field("at_1", &self.lookup(1.0))
            .finish_non_exhaustive()
    }
}

// -------------------------------------------------------------------------------------------------

/// A rectangle in (density, gradient magnitude) space with a color, for building
/// [`TransferFunction2D`]s.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[expect(clippy::exhaustive_structs)]
pub struct TransferRegion {
    /// Inclusive range of normalized density.
    pub density: [f32; 2],
    /// Inclusive range of normalized gradient magnitude.
    pub gradient: [f32; 2],
    /// Color of the region.
    pub color: Rgba,
}

impl TransferRegion {
    fn contains(&self, density: f32, gradient: f32) -> bool {
        (self.density[0]..=self.density[1]).contains(&density)
            && (self.gradient[0]..=self.gradient[1]).contains(&gradient)
    }
}

/// A lookup table from normalized density and normalized gradient magnitude to color
/// and opacity.
///
/// Indexing by gradient magnitude as well as density lets boundaries between materials
/// (high gradient) be colored differently from their interiors.
#[derive(Clone, PartialEq)]
pub struct TransferFunction2D {
    /// Density-major: index is `density_index + gradient_index * TABLE_SIZE`.
    table: Arc<[Rgba]>,
}

impl TransferFunction2D {
    /// Builds the table by evaluating `f(density, gradient_magnitude)` at the center of
    /// each entry.
    pub fn from_fn(mut f: impl FnMut(f32, f32) -> Rgba) -> Self {
        let mut table = Vec::with_capacity(TABLE_SIZE * TABLE_SIZE);
        for g in 0..TABLE_SIZE {
            for d in 0..TABLE_SIZE {
                table.push(f(entry_center(d), entry_center(g)));
            }
        }
        Self {
            table: table.into(),
        }
    }

    /// Builds the table from rectangular regions. Where regions overlap, the one with the
    /// greatest opacity wins; outside every region the table is transparent.
    pub fn from_regions(regions: &[TransferRegion]) -> Self {
        Self::from_fn(|d, g| {
            regions
                .iter()
                .filter(|region| region.contains(d, g))
                .map(|region| region.color)
                .max_by(|a, b| a.alpha().total_cmp(&b.alpha()))
                .unwrap_or(Rgba::TRANSPARENT)
        })
    }

    /// Maps `density` and `gradient_magnitude`, both in `[0, 1]` (clamped), to a color.
    #[inline]
    pub fn lookup(&self, density: f32, gradient_magnitude: f32) -> Rgba {
        self.table[table_index(density) + table_index(gradient_magnitude) * TABLE_SIZE]
    }
}

impl fmt::Debug for TransferFunction2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferFunction2D").finish_non_exhaustive()
    }
}

// -------------------------------------------------------------------------------------------------

/// The transfer function used to classify a volume's samples.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum TransferFunction {
    /// Lookup by density of the first channel.
    OneD(TransferFunction1D),
    /// Lookup by density of the first channel and normalized gradient magnitude.
    /// Requires a gradient resource.
    TwoD(TransferFunction2D),
    /// Independent lookups for two density channels, combined by opacity-weighted sum of
    /// colors and maximum of opacities. Requires a dual-channel density resource.
    Dual {
        /// Transfer function for the first channel.
        red: TransferFunction1D,
        /// Transfer function for the second channel.
        green: TransferFunction1D,
    },
}

impl TransferFunction {
    /// Whether lookups depend on gradient magnitude.
    pub fn needs_gradient(&self) -> bool {
        matches!(self, Self::TwoD(_))
    }

    /// Number of density channels lookups read.
    pub fn channel_count(&self) -> usize {
        match self {
            Self::Dual { .. } => 2,
            Self::OneD(_) | Self::TwoD(_) => 1,
        }
    }

    /// Classifies one sample.
    ///
    /// For [`TransferFunction::Dual`], the combined color is
    /// `red.rgb × red.a + green.rgb × green.a` with opacity `max(red.a, green.a)`; it is
    /// returned un-premultiplied so that compositing treats every variant alike.
    #[inline]
    pub fn classify(&self, densities: [f32; 2], gradient_magnitude: f32) -> Rgba {
        match self {
            Self::OneD(tf) => tf.lookup(densities[0]),
            Self::TwoD(tf) => tf.lookup(densities[0], gradient_magnitude),
            Self::Dual { red, green } => {
                combine_dual(red.lookup(densities[0]), green.lookup(densities[1]))
            }
        }
    }
}

/// Combines the two classified channels of a dual-channel sample.
pub fn combine_dual(red: Rgba, green: Rgba) -> Rgba {
    let rgb = red.premultiplied_rgb() + green.premultiplied_rgb();
    let alpha = red.alpha().max(green.alpha());
    if alpha <= 0.0 {
        return Rgba::TRANSPARENT;
    }
    (rgb * alpha.recip()).with_alpha(alpha)
}

// -------------------------------------------------------------------------------------------------

fn entry_center(index: usize) -> f32 {
    (index as f32 + 0.5) / TABLE_SIZE as f32
}

#[inline]
fn table_index(value: f32) -> usize {
    // NaN becomes 0 by the saturating cast.
    ((value * TABLE_SIZE as f32) as usize).min(TABLE_SIZE - 1)
}

fn lerp_rgba(a: Rgba, b: Rgba, t: f32) -> Rgba {
    a.to_rgb()
        .lerp(b.to_rgb(), t)
        .with_alpha(a.alpha() + (b.alpha() - a.alpha()) * t)
}

/// A [`TransferFunction1D`] that is black and transparent below `threshold` and `color`
/// at and above it.
pub fn step_1d(threshold: f32, color: Rgba) -> TransferFunction1D {
    TransferFunction1D::from_fn(|d| if d >= threshold { color } else { Rgba::TRANSPARENT })
}

/// A grayscale ramp: density `d` maps to luminance `d` and opacity `d`.
pub fn grayscale_ramp() -> TransferFunction1D {
    TransferFunction1D::from_fn(|d| Rgb::from_luminance(d).with_alpha(d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lookup_clamps() {
        let tf = grayscale_ramp();
        assert_eq!(tf.lookup(-3.0), tf.lookup(0.0));
        assert_eq!(tf.lookup(7.0), tf.lookup(1.0));
        assert_eq!(tf.lookup(f32::NAN), tf.lookup(0.0));
        assert_eq!(tf.table().len(), TABLE_SIZE);
    }

    #[test]
    fn control_points_interpolate() {
        let tf = TransferFunction1D::from_control_points(&[
            (1.0, Rgba::new(1.0, 0.0, 0.0, 1.0)),
            (0.0, Rgba::TRANSPARENT),
        ])
        .unwrap();
        let mid = tf.lookup(0.5);
        assert!((mid.alpha() - 0.5).abs() < 0.01, "{mid:?}");
        assert!((mid.red() - 0.5).abs() < 0.01, "{mid:?}");
        assert_eq!(tf.lookup(1.0), tf.table()[TABLE_SIZE - 1]);
        assert_eq!(TransferFunction1D::from_control_points(&[]), None);
    }

    #[test]
    fn regions_pick_most_opaque() {
        let faint = Rgba::new(0.0, 0.0, 1.0, 0.2);
        let strong = Rgba::new(1.0, 1.0, 0.0, 0.9);
        let tf = TransferFunction2D::from_regions(&[
            TransferRegion {
                density: [0.0, 1.0],
                gradient: [0.0, 1.0],
                color: faint,
            },
            TransferRegion {
                density: [0.5, 1.0],
                gradient: [0.5, 1.0],
                color: strong,
            },
        ]);
        assert_eq!(tf.lookup(0.7, 0.1), faint);
        assert_eq!(tf.lookup(0.7, 0.8), strong);
        assert_eq!(TransferFunction2D::from_regions(&[]).lookup(0.5, 0.5), Rgba::TRANSPARENT);
    }

    #[test]
    fn dual_combination() {
        let red = Rgba::new(1.0, 0.0, 0.0, 0.5);
        let green = Rgba::new(0.0, 1.0, 0.0, 0.25);
        let combined = combine_dual(red, green);
        assert_eq!(combined.alpha(), 0.5);
        // premultiplied result is red·0.5 + green·0.25
        assert_eq!(combined.premultiplied_rgb(), Rgb::new(0.5, 0.25, 0.0));
        assert_eq!(combine_dual(Rgba::TRANSPARENT, Rgba::TRANSPARENT), Rgba::TRANSPARENT);
    }

    #[test]
    fn classify_dispatch() {
        let red = step_1d(0.5, Rgba::new(1.0, 0.0, 0.0, 1.0));
        let dual = TransferFunction::Dual {
            red: red.clone(),
            green: TransferFunction1D::constant(Rgba::TRANSPARENT),
        };
        assert_eq!(dual.channel_count(), 2);
        assert_eq!(dual.classify([0.9, 0.0], 0.0), Rgba::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(dual.classify([0.1, 0.9], 0.0), Rgba::TRANSPARENT);
        let one = TransferFunction::OneD(red);
        assert!(!one.needs_gradient());
        assert_eq!(one.classify([0.4, 0.0], 1.0), Rgba::TRANSPARENT);
    }
}
