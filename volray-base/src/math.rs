//! Mathematical utilities and decisions.

mod aab;
pub use aab::*;
mod color;
pub use color::*;
mod coord;
pub use coord::*;
mod vol;
pub use vol::*;

// We make an assumption in several places that `usize` is at least 32 bits.
// It's likely that compilation would not succeed anyway, but let's make it explicit.
#[cfg(target_pointer_width = "16")]
compile_error!("volray does not support platforms with less than 32-bit `usize`");

/// Linear interpolation from `a` to `b`.
///
/// Written as `a + (b - a) * t` so that interpolating between equal values returns that
/// value exactly, whatever `t` is.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Hermite smoothstep: 0 at or below `edge0`, 1 at or above `edge1`, smooth in between.
///
/// If the edges are equal, this is a hard step at that value.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_of_equal_values_is_exact() {
        let v = 200.0 / 255.0;
        for t in [0.0, 0.1, 0.33, 0.5, 0.9999, 1.0] {
            assert_eq!(lerp(v, v, t), v);
        }
    }

    #[test]
    fn smoothstep_edges() {
        assert_eq!(smoothstep(0.2, 0.4, 0.0), 0.0);
        assert!((smoothstep(0.2, 0.4, 0.3) - 0.5).abs() < 1e-6);
        assert_eq!(smoothstep(0.2, 0.4, 1.0), 1.0);
        // degenerate band is a step
        assert_eq!(smoothstep(0.5, 0.5, 0.49), 0.0);
        assert_eq!(smoothstep(0.5, 0.5, 0.5), 1.0);
    }
}
