//! [`VolumeScene`]: the committed resources a renderer reads.

use std::sync::Arc;

use volray::math::GridSize;
use volray::resource::{DensityTexture, GradientTexture, ResourceKind};
use volray::{Dataset, VolumeTransform};

use crate::noise::JitterTile;
use crate::{Interpolation, ShadowVolume, TransferFunction};

/// Error from assembling a [`VolumeScene`] out of incompatible parts.
#[derive(Clone, Debug, Eq, PartialEq, displaydoc::Display)]
#[non_exhaustive]
pub enum SceneError {
    /// the {0} resource has not been committed yet
    NotReady(ResourceKind),

    /// the dual-channel transfer function requires a density resource with two channels
    MissingSecondChannel,

    /// the 2D transfer function requires a gradient resource
    MissingGradient,

    /// gradient resource size {gradient:?} does not match density resource size {density:?}
    SizeMismatch {
        /// Size of the density resource.
        density: GridSize,
        /// Size of the gradient resource.
        gradient: GridSize,
    },
}

impl std::error::Error for SceneError {}

/// One volume's resources and the transfer function that classifies it.
#[derive(Clone, Debug)]
pub struct VolumeLayer {
    density: Arc<DensityTexture>,
    gradient: Option<Arc<GradientTexture>>,
    transfer_function: TransferFunction,
    interpolation: Option<Interpolation>,
}

impl VolumeLayer {
    /// Checks that the resources suit `transfer_function` and each other.
    ///
    /// The gradient resource is optional unless the transfer function is 2D; without it,
    /// lighting and the surface gradient filter see zero gradients.
    pub fn new(
        density: Arc<DensityTexture>,
        gradient: Option<Arc<GradientTexture>>,
        transfer_function: TransferFunction,
    ) -> Result<Self, SceneError> {
        if transfer_function.channel_count() > density.channel_count() {
            return Err(SceneError::MissingSecondChannel);
        }
        if transfer_function.needs_gradient() && gradient.is_none() {
            return Err(SceneError::MissingGradient);
        }
        if let Some(gradient) = &gradient {
            if gradient.size() != density.size() {
                return Err(SceneError::SizeMismatch {
                    density: density.size(),
                    gradient: gradient.size(),
                });
            }
        }
        Ok(Self {
            density,
            gradient,
            transfer_function,
            interpolation: None,
        })
    }

    /// Takes the committed resources of `dataset`.
    ///
    /// Fails with [`SceneError::NotReady`] if the density resource (or, for a 2D transfer
    /// function, the gradient resource) has not been committed yet. Otherwise a committed
    /// gradient resource is used if there is one.
    pub fn from_dataset(
        dataset: &Dataset,
        transfer_function: TransferFunction,
    ) -> Result<Self, SceneError> {
        let density = dataset
            .try_density_resource()
            .ok_or(SceneError::NotReady(ResourceKind::Density))?;
        let gradient = dataset.try_gradient_resource();
        if transfer_function.needs_gradient() && gradient.is_none() {
            return Err(SceneError::NotReady(ResourceKind::Gradient));
        }
        Self::new(density, gradient, transfer_function)
    }

    /// Samples this layer with `interpolation` instead of
    /// [`RenderOptions::interpolation`](crate::RenderOptions::interpolation).
    #[must_use]
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = Some(interpolation);
        self
    }

    /// The interpolation chosen for this layer, if it overrides the rendering options.
    pub fn interpolation(&self) -> Option<Interpolation> {
        self.interpolation
    }

    /// The density resource.
    pub fn density(&self) -> &DensityTexture {
        &self.density
    }

    /// The gradient resource, if any.
    pub fn gradient(&self) -> Option<&GradientTexture> {
        self.gradient.as_deref()
    }

    /// The transfer function.
    pub fn transfer_function(&self) -> &TransferFunction {
        &self.transfer_function
    }
}

/// Everything needed to render: one or two registered volume layers placed in world space,
/// and optionally a shadow volume for the first.
///
/// A scene holds only immutable, committed resources, so any number of threads may render
/// it at once.
#[derive(Clone, Debug)]
pub struct VolumeScene {
    transform: VolumeTransform,
    primary: VolumeLayer,
    secondary: Option<VolumeLayer>,
    shadow: Option<Arc<ShadowVolume>>,
    jitter: JitterTile,
}

impl VolumeScene {
    /// A scene of one layer placed by `transform`.
    pub fn new(transform: VolumeTransform, primary: VolumeLayer) -> Self {
        Self {
            transform,
            primary,
            secondary: None,
            shadow: None,
            jitter: JitterTile::default(),
        }
    }

    /// A scene of one layer made from the committed resources of `dataset`, placed by its
    /// transform.
    pub fn from_dataset(
        dataset: &Dataset,
        transfer_function: TransferFunction,
    ) -> Result<Self, SceneError> {
        Ok(Self::new(
            *dataset.transform(),
            VolumeLayer::from_dataset(dataset, transfer_function)?,
        ))
    }

    /// Adds a second layer, occupying the same local cube as the first, which combines
    /// with it according to [`RenderOptions::blend`](crate::RenderOptions::blend).
    #[must_use]
    pub fn with_secondary(mut self, secondary: VolumeLayer) -> Self {
        self.secondary = Some(secondary);
        self
    }

    /// Adds a shadow volume, used when [`RenderOptions::shadow`](crate::RenderOptions::shadow)
    /// is enabled.
    #[must_use]
    pub fn with_shadow(mut self, shadow: Arc<ShadowVolume>) -> Self {
        self.shadow = Some(shadow);
        self
    }

    /// Replaces the jitter pattern.
    #[must_use]
    pub fn with_jitter_tile(mut self, jitter: JitterTile) -> Self {
        self.jitter = jitter;
        self
    }

    /// Placement of the volume in world space.
    pub fn transform(&self) -> &VolumeTransform {
        &self.transform
    }

    /// The first layer.
    pub fn primary(&self) -> &VolumeLayer {
        &self.primary
    }

    /// The second layer, if any.
    pub fn secondary(&self) -> Option<&VolumeLayer> {
        self.secondary.as_ref()
    }

    /// The shadow volume, if any.
    pub fn shadow(&self) -> Option<&ShadowVolume> {
        self.shadow.as_deref()
    }

    pub(crate) fn jitter_tile(&self) -> &JitterTile {
        &self.jitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::{TransferFunction1D, TransferFunction2D, grayscale_ramp};
    use euclid::size3;
    use volray::math::{Rgba, Vol};

    fn density() -> Arc<DensityTexture> {
        Arc::new(DensityTexture::Single(Vol::repeat(size3(2, 2, 2), 0.5)))
    }

    #[test]
    fn layer_validation() {
        assert_eq!(
            VolumeLayer::new(
                density(),
                None,
                TransferFunction::Dual {
                    red: grayscale_ramp(),
                    green: TransferFunction1D::constant(Rgba::WHITE),
                },
            )
            .unwrap_err(),
            SceneError::MissingSecondChannel
        );
        assert_eq!(
            VolumeLayer::new(
                density(),
                None,
                TransferFunction::TwoD(TransferFunction2D::from_regions(&[])),
            )
            .unwrap_err(),
            SceneError::MissingGradient
        );
        assert!(
            VolumeLayer::new(density(), None, TransferFunction::OneD(grayscale_ramp())).is_ok()
        );
    }

    #[test]
    fn error_message() {
        assert_eq!(
            SceneError::NotReady(ResourceKind::Gradient).to_string(),
            "the gradient resource has not been committed yet"
        );
    }
}
