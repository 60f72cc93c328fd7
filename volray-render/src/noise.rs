//! Tileable noise for jittering ray start positions.

use rand::{Rng as _, SeedableRng as _};
use rand_xoshiro::Xoshiro256Plus;

/// Side length of a [`JitterTile`].
const TILE_SIZE: usize = 64;

/// A tileable pattern of random offsets in `[0, 1)`, indexed by pixel, used to jitter the
/// start of each ray.
///
/// The pattern is deterministic for a given seed, so renderings are reproducible.
#[derive(Clone, Debug, PartialEq)]
pub struct JitterTile {
    values: Box<[f32]>,
}

impl JitterTile {
    /// Generates a tile from `seed`.
    pub fn new(seed: u64) -> Self {
        let mut rng = Xoshiro256Plus::seed_from_u64(seed);
        Self {
            values: (0..TILE_SIZE * TILE_SIZE)
                .map(|_| rng.random::<f32>())
                .collect(),
        }
    }

    /// Returns the offset for pixel `(x, y)`; the pattern repeats every 64 pixels.
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.values[(x % TILE_SIZE) + (y % TILE_SIZE) * TILE_SIZE]
    }
}

impl Default for JitterTile {
    fn default() -> Self {
        Self::new(0x766f_6c72_6179_0001)
    }
}
