//! Tools that we could imagine being in the Rust standard library, but aren't.

// -------------------------------------------------------------------------------------------------
// Re-exports

#[doc(no_inline)]
pub use yield_progress::{Builder as YieldProgressBuilder, YieldProgress};

pub use volray_base::util::TimeStats;
#[doc(hidden)]
pub use volray_base::util::{ErrorChain, assert_send_sync, log};

// -------------------------------------------------------------------------------------------------

#[doc(hidden)]
pub fn yield_progress_for_testing() -> YieldProgress {
    // Theoretically we should use Tokio's yield function, but it shouldn't matter for
    // tests and I don't want the dependency here.
    yield_progress::Builder::new().build()
}
