//! [`Dataset`], the entity owning one imported volume.

use core::fmt;
use core::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use euclid::Rotation3D;

use crate::downscale;
use crate::gradient::{GradientField, GradientOperator};
use crate::math::{
    Aab, GridSize, GridSizeCoord, Vol, World, WorldSize, WorldVector, max_dimension,
};
use crate::resource::{
    self, BuildInput, DensityTexture, GradientTexture, PendingResource, ResourceCache,
    ResourceError,
};
use crate::smoothing::{BilateralSmoother, DensitySmoother};
use crate::source::DensityArraySource;
use crate::transform::VolumeTransform;
use crate::util::{TimeStats, YieldProgress};
use crate::value_range::ValueRange;

// -------------------------------------------------------------------------------------------------

/// Options affecting how a [`Dataset`] is prepared.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct DatasetOptions {
    /// The largest number of voxels allowed along any axis, i.e. the hardware's maximum
    /// 3-D texture dimension. Larger datasets are downscaled until they fit.
    pub max_dimension: GridSizeCoord,

    /// How gradients are computed.
    pub gradient_operator: GradientOperator,

    /// Smoothing pass used by the smoothed gradient operators. If [`None`], those operators
    /// fall back to their unsmoothed versions.
    pub smoother: Option<Arc<dyn DensitySmoother>>,
}

impl DatasetOptions {
    /// Default value of [`DatasetOptions::max_dimension`].
    pub const DEFAULT_MAX_DIMENSION: GridSizeCoord = 2048;

    /// Constrain fields to valid/practical values.
    #[must_use]
    pub fn repair(mut self) -> Self {
        self.max_dimension = self.max_dimension.max(1);
        self
    }
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            max_dimension: Self::DEFAULT_MAX_DIMENSION,
            gradient_operator: GradientOperator::default(),
            smoother: Some(Arc::new(BilateralSmoother::default())),
        }
    }
}

/// Error when a [`Dataset`] cannot be created from the given arrays.
#[derive(Clone, Debug, Eq, PartialEq, displaydoc::Display)]
#[non_exhaustive]
pub enum DatasetError {
    /// the density array is empty
    EmptyArray,

    /// dataset dimensions {size:?} include a zero
    ZeroDimension {
        /// The requested dimensions.
        size: GridSize,
    },

    /// dataset dimensions {size:?} have a volume that overflows usize
    TooLarge {
        /// The requested dimensions.
        size: GridSize,
    },

    /// density array has {actual} elements but dimensions {size:?} require {expected}
    LengthMismatch {
        /// The requested dimensions.
        size: GridSize,
        /// The volume of `size`.
        expected: usize,
        /// The length of the array.
        actual: usize,
    },

    /// second density channel has {secondary} elements but the first has {primary}
    ChannelMismatch {
        /// Length of the first channel.
        primary: usize,
        /// Length of the second channel.
        secondary: usize,
    },
}

impl std::error::Error for DatasetError {}

// -------------------------------------------------------------------------------------------------

/// One imported volume: its density channels, their value ranges, its placement in
/// world space, and the lookup resources derived from it.
///
/// A dataset changes only by explicit mutation ([`Dataset::set_gradient_operator()`],
/// [`Dataset::set_max_dimension()`], [`Dataset::set_smoother()`]). Each mutation discards
/// every derived resource and makes in-flight builds stale; resources are rebuilt from
/// scratch, never patched.
pub struct Dataset {
    channels: Channels,
    primary_range: ValueRange,
    secondary_range: Option<ValueRange>,
    transform: VolumeTransform,
    options: DatasetOptions,

    /// Incremented by every mutation. Shared with in-flight builds so they can notice.
    generation: Arc<AtomicU64>,
    resources: Arc<ResourceCache>,
    build_times: Arc<Mutex<TimeStats>>,
}

impl Dataset {
    /// Creates a dataset from the arrays provided by `source`.
    ///
    /// If any dimension exceeds `options.max_dimension`, the dataset is repeatedly halved
    /// on every axis (2×2×2 box average, both channels alike) until it fits; the voxel
    /// spacing grows to keep the physical size.
    ///
    /// Fails only on truly invalid input: zero dimensions, an empty array, or arrays whose
    /// lengths do not match the dimensions or each other.
    pub fn new(
        source: impl DensityArraySource,
        options: DatasetOptions,
    ) -> Result<Self, DatasetError> {
        let options = options.repair();
        let size = source.size();
        let primary = source.primary();

        if size.width == 0 || size.height == 0 || size.depth == 0 {
            return Err(DatasetError::ZeroDimension { size });
        }
        let dataless = Vol::new_dataless(size).map_err(|_| DatasetError::TooLarge { size })?;
        if primary.is_empty() {
            return Err(DatasetError::EmptyArray);
        }
        if primary.len() != dataless.volume() {
            return Err(DatasetError::LengthMismatch {
                size,
                expected: dataless.volume(),
                actual: primary.len(),
            });
        }
        if let Some(secondary) = source.secondary() {
            if secondary.len() != primary.len() {
                return Err(DatasetError::ChannelMismatch {
                    primary: primary.len(),
                    secondary: secondary.len(),
                });
            }
        }

        let mut channels = Channels {
            size,
            primary: Arc::from(primary),
            secondary: source.secondary().map(Arc::from),
            voxel_spacing: source.voxel_spacing(),
        };
        channels.fit_within(options.max_dimension);
        let (primary_range, secondary_range) = channels.value_ranges()?;

        Ok(Self {
            transform: VolumeTransform::new(channels.physical_size()),
            channels,
            primary_range,
            secondary_range,
            options,
            generation: Arc::new(AtomicU64::new(0)),
            resources: Arc::new(ResourceCache::new(0)),
            build_times: Arc::default(),
        })
    }

    // --- Accessors ---

    /// Dimensions `(nx, ny, nz)`, after any downscaling.
    pub fn size(&self) -> GridSize {
        self.channels.size
    }

    /// 1 or 2.
    pub fn channel_count(&self) -> usize {
        if self.channels.secondary.is_some() { 2 } else { 1 }
    }

    /// The first density channel.
    pub fn primary(&self) -> Vol<&[i32]> {
        self.channels.vol(&self.channels.primary)
    }

    /// The second density channel, if any.
    pub fn secondary(&self) -> Option<Vol<&[i32]>> {
        self.channels
            .secondary
            .as_ref()
            .map(|data| self.channels.vol(data))
    }

    /// Value range of the first channel.
    pub fn value_range(&self) -> ValueRange {
        self.primary_range
    }

    /// Value range of the second channel, if any.
    pub fn secondary_value_range(&self) -> Option<ValueRange> {
        self.secondary_range
    }

    /// Physical extent of one voxel.
    pub fn voxel_spacing(&self) -> WorldSize {
        self.channels.voxel_spacing
    }

    /// Physical extent of the whole dataset: dimensions × voxel spacing.
    pub fn physical_size(&self) -> WorldSize {
        self.transform.physical_size()
    }

    /// Bounds of the dataset in its own local space, which is always the unit cube.
    pub fn local_bounds(&self) -> Aab {
        Aab::UNIT_CUBE
    }

    /// Placement of the dataset in world space.
    pub fn transform(&self) -> &VolumeTransform {
        &self.transform
    }

    /// Sets the orientation of the dataset in world space. Does not affect resources.
    pub fn set_rotation(&mut self, rotation: Rotation3D<f64, World, World>) {
        self.transform = self.transform.with_rotation(rotation);
    }

    /// Sets the world position of the dataset's center. Does not affect resources.
    pub fn set_translation(&mut self, translation: WorldVector) {
        self.transform = self.transform.with_translation(translation);
    }

    /// The options in effect.
    pub fn options(&self) -> &DatasetOptions {
        &self.options
    }

    /// Number of mutations so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Durations of all resource builds of this dataset that ran to completion.
    pub fn build_times(&self) -> TimeStats {
        *self
            .build_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // --- Mutations ---

    /// Switches the gradient operator, discarding the cached gradients and every other
    /// derived resource. Setting the operator already in use does nothing.
    pub fn set_gradient_operator(&mut self, operator: GradientOperator) {
        if self.options.gradient_operator == operator {
            return;
        }
        self.options.gradient_operator = operator;
        self.invalidate();
    }

    /// Replaces the smoothing pass used by the smoothed gradient operators, discarding all
    /// derived resources.
    pub fn set_smoother(&mut self, smoother: Option<Arc<dyn DensitySmoother>>) {
        self.options.smoother = smoother;
        self.invalidate();
    }

    /// Lowers (or raises) the dimension limit. If the dataset no longer fits, it is
    /// downscaled as on construction and all derived resources are discarded.
    /// Raising the limit never restores resolution already lost.
    pub fn set_max_dimension(&mut self, max_dimension: GridSizeCoord) {
        self.options.max_dimension = max_dimension.max(1);
        if self.channels.fit_within(self.options.max_dimension) {
            // Ranges of a downscaled non-empty array always exist.
            if let Ok((primary, secondary)) = self.channels.value_ranges() {
                self.primary_range = primary;
                self.secondary_range = secondary;
            }
            self.transform = self
                .transform
                .with_physical_size(self.channels.physical_size());
            self.invalidate();
        }
    }

    fn invalidate(&mut self) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.resources = Arc::new(ResourceCache::new(generation));
    }

    // --- Derived data ---

    /// Returns the first channel normalized to `[0, 1]` by its value range.
    pub fn normalized_density(&self) -> Vol<Box<[f32]>> {
        resource::normalize_channel(self.size(), &self.channels.primary, self.primary_range)
    }

    /// Computes the gradient of the first channel with the configured operator,
    /// synchronously and without caching. Prefer [`Dataset::gradient_resource()`] for
    /// rendering.
    pub fn compute_gradient(&self) -> GradientField {
        GradientField::compute(
            self.normalized_density().as_ref(),
            self.options.gradient_operator,
            self.options.smoother.as_deref(),
        )
    }

    // --- Resources ---

    fn build_input(&self) -> BuildInput {
        BuildInput {
            size: self.size(),
            primary: self.channels.primary.clone(),
            primary_range: self.primary_range,
            secondary: self
                .channels
                .secondary
                .clone()
                .zip(self.secondary_range),
            operator: self.options.gradient_operator,
            smoother: self.options.smoother.clone(),
            cache: self.resources.clone(),
            current_generation: self.generation.clone(),
            build_times: self.build_times.clone(),
        }
    }

    /// Starts building the density resource, or fetches it if already committed.
    ///
    /// The returned future owns everything it needs and may be run on any thread; the
    /// resulting [`PendingResource`] should be committed by the thread that owns the
    /// renderer's resources. If another build of the same resource is in flight, the
    /// future waits for it instead of building again.
    pub fn request_density_resource(
        &self,
        progress: YieldProgress,
    ) -> impl Future<Output = Result<PendingResource<DensityTexture>, ResourceError>>
    + Send
    + use<> {
        resource::build_density(self.build_input(), progress)
    }

    /// Starts building the gradient resource, or fetches it if already committed.
    ///
    /// See [`Dataset::request_density_resource()`] for the threading contract.
    pub fn request_gradient_resource(
        &self,
        progress: YieldProgress,
    ) -> impl Future<Output = Result<PendingResource<GradientTexture>, ResourceError>>
    + Send
    + use<> {
        resource::build_gradient(self.build_input(), progress)
    }

    /// Builds (if necessary) and commits the density resource.
    pub async fn density_resource(
        &self,
        progress: YieldProgress,
    ) -> Result<Arc<DensityTexture>, ResourceError> {
        self.request_density_resource(progress).await?.commit()
    }

    /// Builds (if necessary) and commits the gradient resource.
    pub async fn gradient_resource(
        &self,
        progress: YieldProgress,
    ) -> Result<Arc<GradientTexture>, ResourceError> {
        self.request_gradient_resource(progress).await?.commit()
    }

    /// Returns the committed density resource, or [`None`] if it is not ready yet.
    pub fn try_density_resource(&self) -> Option<Arc<DensityTexture>> {
        self.resources.try_density()
    }

    /// Returns the committed gradient resource, or [`None`] if it is not ready yet.
    pub fn try_gradient_resource(&self) -> Option<Arc<GradientTexture>> {
        self.resources.try_gradient()
    }

    /// Maximum gradient magnitude of the committed gradient resource, or [`None`] if it is
    /// not ready yet.
    pub fn gradient_max(&self) -> Option<f32> {
        self.try_gradient_resource()
            .map(|texture| texture.max_magnitude())
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("size", &self.channels.size)
            .field("channel_count", &self.channel_count())
            .field("primary_range", &self.primary_range)
            .field("secondary_range", &self.secondary_range)
            .field("transform", &self.transform)
            .field("options", &self.options)
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

// -------------------------------------------------------------------------------------------------

/// The density arrays of a dataset and their geometry.
#[derive(Clone)]
struct Channels {
    size: GridSize,
    primary: Arc<[i32]>,
    secondary: Option<Arc<[i32]>>,
    voxel_spacing: WorldSize,
}

impl Channels {
    fn vol<'a>(&self, data: &'a [i32]) -> Vol<&'a [i32]> {
        Vol::from_elements(self.size, data)
            .unwrap_or_else(|_| unreachable!("dataset arrays always match the dataset size"))
    }

    fn physical_size(&self) -> WorldSize {
        let s = self.size;
        let sp = self.voxel_spacing;
        WorldSize::new(
            f64::from(s.width) * sp.width,
            f64::from(s.height) * sp.height,
            f64::from(s.depth) * sp.depth,
        )
    }

    /// Halves every axis until the largest is at most `limit`. Returns whether anything
    /// changed.
    fn fit_within(&mut self, limit: GridSizeCoord) -> bool {
        let original = self.size;
        while max_dimension(self.size) > limit {
            let old = self.size;
            let new = downscale::halved_size(old);
            self.primary = downscale::halve(self.vol(&self.primary)).into_elements().into();
            self.secondary = self
                .secondary
                .as_deref()
                .map(|data| downscale::halve(self.vol(data)).into_elements().into());
            let sp = self.voxel_spacing;
            self.voxel_spacing = WorldSize::new(
                sp.width * f64::from(old.width) / f64::from(new.width),
                sp.height * f64::from(old.height) / f64::from(new.height),
                sp.depth * f64::from(old.depth) / f64::from(new.depth),
            );
            self.size = new;
        }
        if self.size != original {
            log::info!(
                "downscaled dataset from {}×{}×{} to {}×{}×{} to fit the {limit}-voxel limit",
                original.width,
                original.height,
                original.depth,
                self.size.width,
                self.size.height,
                self.size.depth,
            );
            true
        } else {
            false
        }
    }

    fn value_ranges(&self) -> Result<(ValueRange, Option<ValueRange>), DatasetError> {
        let primary = ValueRange::of(&self.primary).ok_or(DatasetError::EmptyArray)?;
        log_if_degenerate("first", primary);
        let secondary = match &self.secondary {
            Some(data) => {
                let range = ValueRange::of(data).ok_or(DatasetError::EmptyArray)?;
                log_if_degenerate("second", range);
                Some(range)
            }
            None => None,
        };
        Ok((primary, secondary))
    }
}

fn log_if_degenerate(channel: &str, range: ValueRange) {
    if range.is_degenerate() {
        log::debug!("{channel} density channel is constant ({range}); normalizing with range 1");
    }
}
