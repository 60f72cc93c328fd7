//! Lookup resources built from a [`Dataset`](crate::Dataset), and the machinery that builds
//! them.
//!
//! A build runs in two weighted stages reported through a [`YieldProgress`]:
//! “convert” (normalization, and for gradients the gradient computation itself) takes the
//! first 80% and “upload” (packing into the final lookup layout) the remaining 20%.
//! The result is a [`PendingResource`], which must be [committed](PendingResource::commit)
//! before anyone else can use it. Committing is a separate step so that it can happen on
//! whichever thread owns the renderer's resources, while the build runs anywhere.
//!
//! At most one build per dataset per [`ResourceKind`] is in flight: a second request waits
//! until the first one's [`PendingResource`] has been committed or dropped, and then
//! receives the committed resource instead of building again.
//!
//! A build started before the dataset was mutated is *stale*. It stops at its next yield
//! point, and a stale [`PendingResource`] refuses to commit.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures_util::lock::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::gradient::{GradientField, GradientOperator, GradientVector};
use crate::math::{GridSize, Vol};
use crate::parallel;
use crate::smoothing::DensitySmoother;
use crate::util::{TimeStats, YieldProgress};
use crate::value_range::ValueRange;

/// Builds taking longer than this are reported at trace level.
const SLOW_BUILD: Duration = Duration::from_millis(50);

// -------------------------------------------------------------------------------------------------

/// The two kinds of lookup resource a dataset provides.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[expect(clippy::exhaustive_enums)]
pub enum ResourceKind {
    /// [`DensityTexture`].
    Density,
    /// [`GradientTexture`].
    Gradient,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Density => "density",
            ResourceKind::Gradient => "gradient",
        })
    }
}

/// Error from building or committing a resource.
///
/// A resource that is merely not built yet is not an error; the non-blocking getters such
/// as [`Dataset::try_density_resource()`](crate::Dataset::try_density_resource) return
/// [`None`] for it.
#[derive(Clone, Debug, Eq, PartialEq, displaydoc::Display)]
#[non_exhaustive]
pub enum ResourceError {
    /// {kind} resource built for dataset generation {built_for} was discarded because the dataset has since changed
    Stale {
        /// Which resource was being built.
        kind: ResourceKind,
        /// Generation of the dataset when the build started.
        built_for: u64,
    },
}

impl std::error::Error for ResourceError {}

// -------------------------------------------------------------------------------------------------

/// Normalized density, ready for sampling.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum DensityTexture {
    /// One value in `[0, 1]` per voxel.
    Single(Vol<Box<[f32]>>),
    /// Two independently normalized values per voxel, each scaled by its own channel's
    /// value range.
    Dual(Vol<Box<[[f32; 2]]>>),
}

impl DensityTexture {
    /// Dimensions of the texture.
    pub fn size(&self) -> GridSize {
        match self {
            DensityTexture::Single(vol) => vol.size(),
            DensityTexture::Dual(vol) => vol.size(),
        }
    }

    /// 1 or 2.
    pub fn channel_count(&self) -> usize {
        match self {
            DensityTexture::Single(_) => 1,
            DensityTexture::Dual(_) => 2,
        }
    }

    /// Both channel values at linear `index`; the second is zero for a single channel.
    #[inline]
    pub fn channels(&self, index: usize) -> [f32; 2] {
        match self {
            DensityTexture::Single(vol) => [vol.as_linear()[index], 0.0],
            DensityTexture::Dual(vol) => vol.as_linear()[index],
        }
    }

    /// Returns the first channel as its own volume.
    pub fn primary(&self) -> Vol<Box<[f32]>> {
        match self {
            DensityTexture::Single(vol) => vol.clone(),
            DensityTexture::Dual(vol) => vol.map(|&[p, _]| p),
        }
    }
}

/// One voxel of a [`GradientTexture`]: the gradient, scaled so that the largest in the
/// dataset has length 1, packed with the voxel's normalized density so that compositing
/// needs only one lookup for both.
#[derive(Clone, Copy, Debug, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct GradientSample {
    /// Gradient direction; its length is the normalized gradient magnitude in `[0, 1]`.
    pub direction: GradientVector,
    /// Normalized density of the first channel.
    pub density: f32,
}

/// Per-voxel gradients, ready for sampling.
#[derive(Clone, Debug, PartialEq)]
pub struct GradientTexture {
    samples: Vol<Box<[GradientSample]>>,
    max_magnitude: f32,
    operator: GradientOperator,
}

impl GradientTexture {
    /// Packs `field` together with the normalized `density` it was computed from.
    pub fn new(field: &GradientField, density: Vol<&[f32]>) -> Self {
        let size = field.vectors().size();
        assert_eq!(size, density.size(), "gradient and density sizes differ");
        let divisor = field.normalizing_divisor();
        let samples = field
            .vectors()
            .as_linear()
            .iter()
            .zip(density.as_linear())
            .map(|(&g, &d)| GradientSample {
                direction: g / divisor,
                density: d,
            })
            .collect::<Box<[_]>>();
        Self {
            samples: Vol::from_elements(size, samples)
                .unwrap_or_else(|_| unreachable!("samples were collected from a Vol of this size")),
            max_magnitude: field.max_magnitude(),
            operator: field.operator(),
        }
    }

    /// The packed samples.
    pub fn samples(&self) -> Vol<&[GradientSample]> {
        self.samples.as_ref()
    }

    /// Dimensions of the texture.
    pub fn size(&self) -> GridSize {
        self.samples.size()
    }

    /// Largest gradient magnitude of the field, before scaling. Zero for a flat field.
    pub fn max_magnitude(&self) -> f32 {
        self.max_magnitude
    }

    /// The operator that produced the gradients.
    pub fn operator(&self) -> GradientOperator {
        self.operator
    }
}

// -------------------------------------------------------------------------------------------------

type Slot<T> = Arc<AsyncMutex<Option<Arc<T>>>>;

/// Committed resources of one dataset generation.
///
/// A mutation of the dataset replaces the whole cache, so nothing built for an earlier
/// generation is ever visible through the new one.
#[derive(Debug)]
pub(crate) struct ResourceCache {
    generation: u64,
    density: Slot<DensityTexture>,
    gradient: Slot<GradientTexture>,
}

impl ResourceCache {
    pub(crate) fn new(generation: u64) -> Self {
        Self {
            generation,
            density: Arc::new(AsyncMutex::new(None)),
            gradient: Arc::new(AsyncMutex::new(None)),
        }
    }

    /// Returns the committed density resource, or [`None`] if it is not built or a build is
    /// in progress.
    pub(crate) fn try_density(&self) -> Option<Arc<DensityTexture>> {
        self.density.try_lock()?.clone()
    }

    /// Returns the committed gradient resource, or [`None`] if it is not built or a build is
    /// in progress.
    pub(crate) fn try_gradient(&self) -> Option<Arc<GradientTexture>> {
        self.gradient.try_lock()?.clone()
    }
}

/// Everything a build needs, captured from the dataset so that the build owns its inputs
/// and may run on another thread.
pub(crate) struct BuildInput {
    pub(crate) size: GridSize,
    pub(crate) primary: Arc<[i32]>,
    pub(crate) primary_range: ValueRange,
    pub(crate) secondary: Option<(Arc<[i32]>, ValueRange)>,
    pub(crate) operator: GradientOperator,
    pub(crate) smoother: Option<Arc<dyn DensitySmoother>>,
    pub(crate) cache: Arc<ResourceCache>,
    pub(crate) current_generation: Arc<AtomicU64>,
    pub(crate) build_times: Arc<Mutex<TimeStats>>,
}

impl BuildInput {
    fn is_stale(&self) -> bool {
        self.current_generation.load(Ordering::Acquire) != self.cache.generation
    }

    fn stale(&self, kind: ResourceKind) -> ResourceError {
        log::debug!(
            "abandoning stale {kind} build for dataset generation {}",
            self.cache.generation
        );
        ResourceError::Stale {
            kind,
            built_for: self.cache.generation,
        }
    }

    fn record_time(&self, kind: ResourceKind, start: Instant) {
        let elapsed = start.elapsed();
        *self
            .build_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += TimeStats::one(elapsed);
        if elapsed > SLOW_BUILD {
            log::trace!(
                "{kind} resource for {}×{}×{} took {elapsed:.2?}",
                self.size.width,
                self.size.height,
                self.size.depth
            );
        }
    }

    fn pending<T>(
        &self,
        kind: ResourceKind,
        slot: OwnedMutexGuard<Option<Arc<T>>>,
        resource: Arc<T>,
    ) -> PendingResource<T> {
        PendingResource {
            slot,
            resource,
            kind,
            built_for: self.cache.generation,
            current_generation: self.current_generation.clone(),
        }
    }

    fn normalized_primary(&self) -> Vol<Box<[f32]>> {
        normalize_channel(self.size, &self.primary, self.primary_range)
    }
}

/// Maps every value of `data` into `[0, 1]` using `range`.
pub(crate) fn normalize_channel(
    size: GridSize,
    data: &[i32],
    range: ValueRange,
) -> Vol<Box<[f32]>> {
    Vol::from_elements(size, parallel::map_elements(data, |&v| range.normalize(v)))
        .unwrap_or_else(|_| unreachable!("dataset arrays always match the dataset size"))
}

pub(crate) async fn build_density(
    input: BuildInput,
    progress: YieldProgress,
) -> Result<PendingResource<DensityTexture>, ResourceError> {
    const KIND: ResourceKind = ResourceKind::Density;
    let slot = input.cache.density.clone().lock_owned().await;
    if let Some(existing) = slot.clone() {
        progress.finish().await;
        return Ok(input.pending(KIND, slot, existing));
    }
    if input.is_stale() {
        return Err(input.stale(KIND));
    }
    let start = Instant::now();

    let [mut convert, mut upload] = progress.split(0.8);
    convert.set_label("Normalizing density");
    convert.progress(0.0).await;
    let primary = input.normalized_primary();
    let secondary = match &input.secondary {
        Some((data, range)) => {
            convert.progress(0.5).await;
            if input.is_stale() {
                return Err(input.stale(KIND));
            }
            Some(normalize_channel(input.size, data, *range))
        }
        None => None,
    };
    convert.finish().await;
    if input.is_stale() {
        return Err(input.stale(KIND));
    }

    upload.set_label("Packing density");
    let texture = match secondary {
        None => DensityTexture::Single(primary),
        Some(secondary) => DensityTexture::Dual(
            Vol::from_elements(
                input.size,
                primary
                    .as_linear()
                    .iter()
                    .zip(secondary.as_linear())
                    .map(|(&p, &s)| [p, s])
                    .collect::<Box<[_]>>(),
            )
            .unwrap_or_else(|_| unreachable!("channels have equal sizes")),
        ),
    };
    upload.finish().await;
    if input.is_stale() {
        return Err(input.stale(KIND));
    }

    input.record_time(KIND, start);
    Ok(input.pending(KIND, slot, Arc::new(texture)))
}

pub(crate) async fn build_gradient(
    input: BuildInput,
    progress: YieldProgress,
) -> Result<PendingResource<GradientTexture>, ResourceError> {
    const KIND: ResourceKind = ResourceKind::Gradient;
    let slot = input.cache.gradient.clone().lock_owned().await;
    if let Some(existing) = slot.clone() {
        progress.finish().await;
        return Ok(input.pending(KIND, slot, existing));
    }
    if input.is_stale() {
        return Err(input.stale(KIND));
    }
    let start = Instant::now();

    let [convert, mut upload] = progress.split(0.8);
    let [mut normalize_progress, mut gradient_progress] = convert.split(0.2);
    normalize_progress.set_label("Normalizing density");
    normalize_progress.progress(0.0).await;
    let density = input.normalized_primary();
    normalize_progress.finish().await;
    if input.is_stale() {
        return Err(input.stale(KIND));
    }

    gradient_progress.set_label(format!("Computing {} gradients", input.operator));
    gradient_progress.progress(0.0).await;
    let field = GradientField::compute(density.as_ref(), input.operator, input.smoother.as_deref());
    gradient_progress.finish().await;
    if input.is_stale() {
        return Err(input.stale(KIND));
    }

    upload.set_label("Packing gradients");
    upload.progress(0.0).await;
    let texture = GradientTexture::new(&field, density.as_ref());
    upload.finish().await;
    if input.is_stale() {
        return Err(input.stale(KIND));
    }

    input.record_time(KIND, start);
    Ok(input.pending(KIND, slot, Arc::new(texture)))
}

// -------------------------------------------------------------------------------------------------

/// A built resource awaiting [`commit()`](Self::commit).
///
/// While this exists, other requests for the same resource of the same dataset wait.
/// Dropping it without committing discards the build, and the next request builds again.
pub struct PendingResource<T> {
    slot: OwnedMutexGuard<Option<Arc<T>>>,
    resource: Arc<T>,
    kind: ResourceKind,
    built_for: u64,
    current_generation: Arc<AtomicU64>,
}

impl<T> PendingResource<T> {
    /// The built resource, for inspection before committing (e.g. to upload it).
    pub fn payload(&self) -> &T {
        &self.resource
    }

    /// Which resource this is.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Whether the dataset has been mutated since this build started, so that
    /// [`commit()`](Self::commit) would fail.
    pub fn is_stale(&self) -> bool {
        self.current_generation.load(Ordering::Acquire) != self.built_for
    }

    /// Publishes the resource to the dataset's cache and returns it.
    ///
    /// Fails with [`ResourceError::Stale`] if the dataset was mutated after the build
    /// started; the resource is then discarded.
    pub fn commit(mut self) -> Result<Arc<T>, ResourceError> {
        if self.is_stale() {
            log::debug!(
                "discarding stale {kind} resource built for dataset generation {built_for}",
                kind = self.kind,
                built_for = self.built_for
            );
            return Err(ResourceError::Stale {
                kind: self.kind,
                built_for: self.built_for,
            });
        }
        *self.slot = Some(self.resource.clone());
        Ok(self.resource)
    }
}

impl<T> fmt::Debug for PendingResource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingResource")
            .field("kind", &self.kind)
            .field("built_for", &self.built_for)
            .field("stale", &self.is_stale())
            .finish_non_exhaustive()
    }
}
