use core::fmt;

/// Performance info about ray-marching some pixels; summed over an image by
/// [`VolumeRenderer::render()`](crate::VolumeRenderer::render).
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct RaymarchInfo {
    /// Number of rays cast.
    pub rays: usize,
    /// Number of rays that intersected the volume.
    pub rays_hit: usize,
    /// Number of density samples taken.
    pub samples: usize,
    /// Number of samples found empty which caused adaptive stepping to skip ahead.
    pub skipped_empty: usize,
    /// Number of rays that stopped before leaving the volume, because they became opaque
    /// or found a surface.
    pub early_terminations: usize,
}

impl RaymarchInfo {
    /// Average number of samples per ray that hit the volume.
    pub fn samples_per_hit(&self) -> f64 {
        if self.rays_hit == 0 {
            0.0
        } else {
            self.samples as f64 / self.rays_hit as f64
        }
    }
}

impl core::ops::Add for RaymarchInfo {
    type Output = Self;
    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}
impl core::ops::AddAssign<RaymarchInfo> for RaymarchInfo {
    fn add_assign(&mut self, other: Self) {
        self.rays += other.rays;
        self.rays_hit += other.rays_hit;
        self.samples += other.samples;
        self.skipped_empty += other.skipped_empty;
        self.early_terminations += other.early_terminations;
    }
}
impl core::iter::Sum for RaymarchInfo {
    fn sum<I>(iter: I) -> Self
    where
        I: Iterator<Item = Self>,
    {
        let mut sum = Self::default();
        for part in iter {
            sum += part;
        }
        sum
    }
}

impl fmt::Display for RaymarchInfo {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let &Self {
            rays,
            rays_hit,
            samples,
            skipped_empty,
            early_terminations,
        } = self;
        write!(
            fmt,
            "Rays: {rays} ({rays_hit} hit)\nSamples: {samples} ({:.1} per hit)\n\
             Empty skips: {skipped_empty}\nEarly terminations: {early_terminations}",
            self.samples_per_hit()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum() {
        let one = RaymarchInfo {
            rays: 1,
            rays_hit: 1,
            samples: 10,
            skipped_empty: 2,
            early_terminations: 1,
        };
        let total: RaymarchInfo = [one, one, RaymarchInfo::default()].into_iter().sum();
        assert_eq!(
            total,
            RaymarchInfo {
                rays: 2,
                rays_hit: 2,
                samples: 20,
                skipped_empty: 4,
                early_terminations: 2,
            }
        );
        assert_eq!(total.samples_per_hit(), 10.0);
    }
}
