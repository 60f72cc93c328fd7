//! Synthetic datasets for trying out the renderer without an input file.

use rand::{Rng as _, SeedableRng as _};
use rand_xoshiro::Xoshiro256Plus;

use volray::math::GridSize;
use volray::source::{DensityArraySource as _, RawDensityArrays};

/// Shapes [`Phantom::generate()`] can produce.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
#[non_exhaustive]
pub enum Phantom {
    /// A solid sphere with a denser core, in 12-bit-like units (0 to 4000).
    Sphere,
    /// Concentric spherical shells of alternating density.
    Shells,
    /// Randomly placed overlapping soft blobs.
    Blobs,
    /// Two channels: a sphere in the first and a ring torus crossing it in the second.
    Dual,
}

impl Phantom {
    /// Generates the phantom at `size`, using `seed` for the random ones.
    pub fn generate(self, size: GridSize, seed: u64) -> RawDensityArrays {
        match self {
            Phantom::Sphere => RawDensityArrays::from_fn(size, |x, y, z| {
                let r = radius(size, x, y, z);
                if r < 0.3 {
                    4000
                } else if r < 0.8 {
                    1000 + (1000.0 * (0.8 - r)) as i32
                } else {
                    0
                }
            }),
            Phantom::Shells => RawDensityArrays::from_fn(size, |x, y, z| {
                let r = radius(size, x, y, z);
                if r < 1.0 {
                    let shell = (r * 5.0) as i32;
                    if shell % 2 == 0 { 200 } else { 50 }
                } else {
                    0
                }
            }),
            Phantom::Blobs => {
                let mut rng = Xoshiro256Plus::seed_from_u64(seed);
                let blobs: Vec<([f64; 3], f64, f64)> = (0..12)
                    .map(|_| {
                        (
                            [rng.random(), rng.random(), rng.random()],
                            rng.random_range(0.05..0.2),
                            rng.random_range(50.0..255.0),
                        )
                    })
                    .collect();
                RawDensityArrays::from_fn(size, |x, y, z| {
                    let p = normalized(size, x, y, z);
                    let density: f64 = blobs
                        .iter()
                        .map(|&(center, radius, peak)| {
                            let d2 = (0..3).map(|i| (p[i] - center[i]).powi(2)).sum::<f64>();
                            peak * (-d2 / (2.0 * radius * radius)).exp()
                        })
                        .sum();
                    density.min(255.0) as i32
                })
            }
            Phantom::Dual => {
                let torus = RawDensityArrays::from_fn(size, |x, y, z| {
                    let p = normalized(size, x, y, z).map(|c| c * 2.0 - 1.0);
                    let ring = (p[0].hypot(p[1]) - 0.6).hypot(p[2]);
                    if ring < 0.15 { 255 } else { 0 }
                });
                Phantom::Sphere
                    .generate(size, seed)
                    .with_secondary(torus.primary())
            }
        }
    }
}

/// Center of voxel `(x, y, z)` in the unit cube.
fn normalized(size: GridSize, x: u32, y: u32, z: u32) -> [f64; 3] {
    [
        (f64::from(x) + 0.5) / f64::from(size.width),
        (f64::from(y) + 0.5) / f64::from(size.height),
        (f64::from(z) + 0.5) / f64::from(size.depth),
    ]
}

/// Distance of voxel `(x, y, z)` from the center of the volume, where the faces are at 1.
fn radius(size: GridSize, x: u32, y: u32, z: u32) -> f64 {
    let p = normalized(size, x, y, z).map(|c| c * 2.0 - 1.0);
    (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt()
}
