//! volray turns a scalar (or dual-channel) 3-D density field into the lookup resources
//! a ray-marching compositor samples.
//!
//! This crate holds the numeric preprocessing pipeline:
//!
//! * [`Dataset`] owns the raw integer density arrays of one imported volume, along with
//!   their dimensions, physical voxel spacing and orientation. Oversized datasets are
//!   downscaled on construction until every axis fits within the configured limit.
//! * [`value_range`] finds the global minimum and maximum of each channel.
//! * [`gradient`] computes per-voxel gradient vectors and their maximum magnitude, with
//!   central-difference or Sobel operators, optionally after an edge-preserving smoothing
//!   pass.
//! * [`resource`] converts the arrays into normalized lookup payloads asynchronously, with
//!   progress reporting, at most one build in flight per kind, and an explicit commit step
//!   which discards builds made stale by a mutation of the dataset.
//!
//! Rendering lives in the separate `volray-render` crate.
//!
//! ## Crate features
//!
//! * `auto-threads`:
//!   Enable use of [`rayon`]’s global thread pool for gradient computation, downscaling,
//!   and normalization. Results are identical with and without this feature.
//! * `serde`: Adds [`serde`] implementations for option types.
//!
//! ## Dependencies and global state
//!
//! `volray` avoids having any global state. However, it does write log messages using the
//! [`log`] crate and is therefore subject to that global configuration.
//!
//! [`rayon`]: https://docs.rs/rayon/
//! [`serde`]: https://docs.rs/serde/
//! [`log`]: https://docs.rs/log/

#![forbid(unsafe_code)]

pub mod math;

pub mod raycast {
    //! Rays in a dataset's local cube space.
    pub use volray_base::raycast::*;
}

mod dataset;
pub use dataset::*;
mod downscale;
pub mod gradient;
mod parallel;
pub mod resource;
pub mod smoothing;
pub mod source;
mod transform;
pub use transform::*;
pub mod util;
pub mod value_range;

/// Re-export the version of the `euclid` vector math library we're using.
pub use euclid;
