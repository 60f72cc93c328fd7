//! Components of the `volray` command-line renderer which are not specific to its
//! argument parsing: dataset sources, terminal progress and logging, and image output.
//!
//! This library is not intended to be used by other crates; it exists so that the binary's
//! pieces can be tested separately.

#![forbid(unsafe_code)]

pub mod logging;
pub mod phantom;
pub mod raw;
pub mod write_png;
