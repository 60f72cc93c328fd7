//! Ray-marching compositor and CPU image renderer for [`volray`] datasets.
//!
//! A [`VolumeScene`] gathers the committed lookup resources of one or two datasets with the
//! [`TransferFunction`]s that classify them. A [`VolumeRenderer`] casts one ray per pixel
//! of its [`Camera`] through the scene and composites it in one of three modes selected
//! by [`RenderOptions::mode`]:
//!
//! * [`RenderMode::Dvr`]: direct volume rendering, front-to-back accumulation of
//!   opacity-corrected color, with optional gradient lighting and shadows.
//! * [`RenderMode::Mip`]: maximum-intensity projection.
//! * [`RenderMode::Surface`]: the first visible sample, lit and opaque.
//!
//! The per-ray compositor, [`raymarch::march_ray()`], is a pure function of its inputs and
//! may be used directly to render any other way.
//!
//! ## Crate features
//!
//! * `auto-threads`:
//!   Render rows and pixels, and compute shadow volumes, on [`rayon`]’s global thread
//!   pool. Results are identical with and without this feature.
//! * `serde`: Adds [`serde`] implementations for [`RenderOptions`].
//!
//! [`rayon`]: https://docs.rs/rayon/
//! [`serde`]: https://docs.rs/serde/

#![forbid(unsafe_code)]

mod camera;
pub use camera::*;
mod info;
pub use info::*;
mod noise;
pub use noise::JitterTile;
mod options;
pub use options::*;
pub mod raymarch;
mod renderer;
pub use renderer::*;
pub mod sample;
mod scene;
pub use scene::*;
mod shadow;
pub use shadow::ShadowVolume;
pub mod transfer;
pub use transfer::TransferFunction;
