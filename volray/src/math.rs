//! Mathematical utilities and decisions.

pub use volray_base::math::*;
