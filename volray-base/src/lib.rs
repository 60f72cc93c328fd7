//! This library is an internal component of [`volray`],
//! which defines some core mathematical types and functions.
//! Do not depend on this library; use only [`volray`] instead.
//!
//! [`volray`]: https://crates.io/crates/volray/

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]
#![warn(clippy::missing_inline_in_public_items)]

/// Do not use this module directly; its contents are re-exported from `volray`.
pub mod math;

/// Do not use this module directly; its contents are re-exported from `volray`.
pub mod raycast;

/// Do not use this module directly; its contents are re-exported from `volray`.
pub mod util;

// reexport for convenience of our tests
#[doc(hidden)]
pub use euclid;
