/// Provides the recommended log filter for programs which want to exclude particularly noisy
/// details of volray’s dependencies.
///
/// The guiding principle for this filtering is that at [`log::Level::Debug`] or lower level,
/// there should be no messages produced per pixel or per voxel unless something is wrong.
#[allow(clippy::missing_inline_in_public_items)]
pub fn standard_filter(metadata: &log::Metadata<'_>) -> bool {
    let target = metadata.target();

    !(target.starts_with("tracing::span") // logs every single tracing span
        || target.starts_with("rayon") // noisy at Trace level
        || target.starts_with("mio::") // tokio's reactor; noisy at Trace level
        || target.starts_with("png::")) // logs every chunk
}
