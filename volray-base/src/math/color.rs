//! Color data types. This module is private but reexported by its parent.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul};

use euclid::{Vector3D, vec3};

/// A floating-point RGB color value.
///
/// * Components are linear (gamma = 1), but use the same RGB primaries as sRGB (Rec. 709).
/// * Depending on the application, they may be considered to have a nominal range of
///   0 to 1, or unbounded. Negative components are clamped to zero on construction.
#[derive(Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(into = "[f32; 3]", try_from = "[f32; 3]")
)]
pub struct Rgb(Vector3D<f32, Intensity>);

/// A floating-point RGBA color value.
///
/// * Color components are linear and follow the rules of [`Rgb`].
/// * The alpha is not premultiplied, and is kept within 0 to 1.
#[derive(Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(into = "[f32; 4]", try_from = "[f32; 4]")
)]
pub struct Rgba {
    rgb: Rgb,
    alpha: f32,
}

/// Error from converting an array containing NaN to a color.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct NanComponent;

impl fmt::Display for NanComponent {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("color component is NaN")
    }
}

impl core::error::Error for NanComponent {}

/// Unit-of-measure type for vectors that contain color channels.
#[expect(clippy::exhaustive_enums)]
#[derive(Debug, Eq, PartialEq)]
pub enum Intensity {}

impl Rgb {
    /// Black; the constant equal to `Rgb::new(0., 0., 0.)`.
    pub const ZERO: Rgb = Rgb(vec3(0.0, 0.0, 0.0));
    /// Nominal white; the constant equal to `Rgb::new(1., 1., 1.)`.
    pub const ONE: Rgb = Rgb(vec3(1.0, 1.0, 1.0));

    /// Constructs a color from components.
    ///
    /// Panics if any component is NaN. Clamps any component that is negative.
    #[inline]
    #[track_caller]
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self(vec3(checked(r), checked(g), checked(b)))
    }

    /// Constructs a shade of gray (components all equal).
    #[inline]
    #[track_caller]
    pub fn from_luminance(luminance: f32) -> Self {
        Self::new(luminance, luminance, luminance)
    }

    /// Adds an alpha component to produce an [`Rgba`] color.
    ///
    /// The alpha is clamped to lie within 0 to 1.
    #[inline]
    pub fn with_alpha(self, alpha: f32) -> Rgba {
        Rgba {
            rgb: self,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    /// Adds an alpha component of `1.0` (fully opaque) to produce an [`Rgba`] color.
    #[inline]
    pub const fn with_alpha_one(self) -> Rgba {
        Rgba {
            rgb: self,
            alpha: 1.0,
        }
    }

    /// Returns the red color component. Values are linear (gamma = 1).
    #[inline]
    pub const fn red(self) -> f32 {
        self.0.x
    }
    /// Returns the green color component. Values are linear (gamma = 1).
    #[inline]
    pub const fn green(self) -> f32 {
        self.0.y
    }
    /// Returns the blue color component. Values are linear (gamma = 1).
    #[inline]
    pub const fn blue(self) -> f32 {
        self.0.z
    }

    /// Clamp each component to lie within the range 0 to `maximum`, inclusive.
    #[inline]
    #[must_use]
    pub fn clamp(self, maximum: f32) -> Self {
        Self(self.0.map(|c| c.clamp(0.0, maximum)))
    }

    /// Linear interpolation between two colors, componentwise.
    #[inline]
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self(self.0.lerp(other.0, t)).clamp(f32::INFINITY)
    }
}

impl Rgba {
    /// Transparent black (all components zero).
    pub const TRANSPARENT: Rgba = Rgba {
        rgb: Rgb::ZERO,
        alpha: 0.0,
    };
    /// White; identical to `Rgba::new(1.0, 1.0, 1.0, 1.0)` except for being a constant.
    pub const WHITE: Rgba = Rgb::ONE.with_alpha_one();

    /// Constructs a color from components. Panics if any component is NaN.
    #[inline]
    #[track_caller]
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Rgb::new(r, g, b).with_alpha(checked(a))
    }

    /// Returns the red color component. Values are linear (gamma = 1) and not premultiplied.
    #[inline]
    pub const fn red(self) -> f32 {
        self.rgb.red()
    }
    /// Returns the green color component. Values are linear (gamma = 1) and not premultiplied.
    #[inline]
    pub const fn green(self) -> f32 {
        self.rgb.green()
    }
    /// Returns the blue color component. Values are linear (gamma = 1) and not premultiplied.
    #[inline]
    pub const fn blue(self) -> f32 {
        self.rgb.blue()
    }
    /// Returns the alpha component.
    #[inline]
    pub const fn alpha(self) -> f32 {
        self.alpha
    }

    /// Discards the alpha component to produce an RGB color.
    #[inline]
    pub const fn to_rgb(self) -> Rgb {
        self.rgb
    }

    /// Returns the color components multiplied by alpha, which is the form in which
    /// colors are accumulated when compositing.
    #[inline]
    pub fn premultiplied_rgb(self) -> Rgb {
        self.rgb * self.alpha
    }

    /// Converts this color lossily to sRGB 8-bits-per-component color.
    #[inline]
    pub fn to_srgb8(self) -> [u8; 4] {
        [
            component_to_srgb8(self.red()),
            component_to_srgb8(self.green()),
            component_to_srgb8(self.blue()),
            (self.alpha * 255.0).round() as u8,
        ]
    }
}

impl From<Rgb> for [f32; 3] {
    #[inline]
    fn from(value: Rgb) -> Self {
        value.0.into()
    }
}
impl From<Rgba> for [f32; 4] {
    #[inline]
    fn from(value: Rgba) -> Self {
        [value.red(), value.green(), value.blue(), value.alpha()]
    }
}

impl TryFrom<[f32; 3]> for Rgb {
    type Error = NanComponent;
    #[inline]
    fn try_from([r, g, b]: [f32; 3]) -> Result<Self, Self::Error> {
        if [r, g, b].iter().any(|c| c.is_nan()) {
            return Err(NanComponent);
        }
        Ok(Rgb::new(r, g, b))
    }
}
impl TryFrom<[f32; 4]> for Rgba {
    type Error = NanComponent;
    #[inline]
    fn try_from([r, g, b, a]: [f32; 4]) -> Result<Self, Self::Error> {
        if a.is_nan() {
            return Err(NanComponent);
        }
        Ok(Rgb::try_from([r, g, b])?.with_alpha(a))
    }
}

impl Add<Rgb> for Rgb {
    type Output = Self;
    #[inline]
    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}
impl AddAssign<Rgb> for Rgb {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}
/// Multiplies two color values componentwise.
impl Mul<Rgb> for Rgb {
    type Output = Self;
    #[inline]
    fn mul(self, other: Rgb) -> Self {
        Self(self.0.component_mul(other.0))
    }
}
impl Mul<f32> for Rgb {
    type Output = Self;
    /// Multiplies this color value by a scalar.
    ///
    /// Panics if the scalar is NaN. Returns zero if the scalar is negative.
    #[inline]
    fn mul(self, scalar: f32) -> Self {
        Self(self.0 * checked(scalar))
    }
}

impl Sum for Rgb {
    #[allow(clippy::missing_inline_in_public_items)]
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Rgb::ZERO, |accum, rgb| accum + rgb)
    }
}

impl fmt::Debug for Rgb {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "Rgb({:?}, {:?}, {:?})",
            self.red(),
            self.green(),
            self.blue()
        )
    }
}
impl fmt::Debug for Rgba {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "Rgba({:?}, {:?}, {:?}, {:?})",
            self.red(),
            self.green(),
            self.blue(),
            self.alpha()
        )
    }
}

#[inline]
#[track_caller]
fn checked(c: f32) -> f32 {
    assert!(!c.is_nan(), "color component is NaN");
    c.max(0.0)
}

/// Apply the sRGB encoding function. Do not use this on alpha values.
#[inline]
fn component_to_srgb(c: f32) -> f32 {
    // Source: <https://en.wikipedia.org/w/index.php?title=SRGB&oldid=1002296118#The_forward_transformation_(CIE_XYZ_to_sRGB)>
    if c <= 0.0031308 {
        c * (323. / 25.)
    } else {
        (211. * c.powf(5. / 12.) - 11.) / 200.
    }
}

#[inline]
fn component_to_srgb8(c: f32) -> u8 {
    // out of range values will be clamped by `as u8`
    (component_to_srgb(c) * 255.).round() as u8
}
