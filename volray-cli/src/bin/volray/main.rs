//! Binary for the volray command-line volume renderer.

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use clap::Parser as _;

use volray::Dataset;
use volray::math::WorldVector;
use volray::source::{DensityArraySource, RawDensityArrays};
use volray::value_range::histogram;
use volray_cli::logging::{self, new_progress_bar, yield_progress_for_bar};
use volray_cli::raw::load_raw;
use volray_cli::write_png::write_png;
use volray_render::{
    Camera, MultiVolumeBlend, Projection, RenderMode, RenderOptions, ShadowVolume, VolumeLayer,
    VolumeRenderer, VolumeScene,
};

mod command_options;
use command_options::{VolrayArgs, secondary_transfer_function};

/// Factor by which the shadow volume is coarser than the density.
const SHADOW_RESOLUTION_DIVISOR: u32 = 2;

fn main() -> Result<(), anyhow::Error> {
    let args = VolrayArgs::parse();
    logging::install(&args.logging)?;

    let options = args.apply_render_args(match &args.options_file {
        Some(path) => read_options_file(path)?,
        None => RenderOptions::default(),
    });
    let transfer_function = args.transfer.build();

    // Load or generate the data.
    let source = match args.raw_volume() {
        Some(volume) => load_raw(&volume)?,
        None => args.phantom.generate(args.dims.0, args.seed),
    };
    let overlay_source = if options.blend == MultiVolumeBlend::None {
        None
    } else {
        Some(second_channel_as_volume(&source).context(
            "blending requires a second density channel (use --secondary or --phantom dual)",
        )?)
    };
    let dataset = Dataset::new(source, args.dataset_options()).context("invalid dataset")?;
    let overlay_dataset = overlay_source
        .map(|source| Dataset::new(source, args.dataset_options()))
        .transpose()
        .context("invalid second channel")?;
    report_dataset(&dataset, args.histogram);

    // Build lookup resources.
    let needs_gradient = transfer_function.needs_gradient()
        || options.lighting.enabled
        || (options.mode == RenderMode::Surface && options.surface_gradient_threshold > 0.0);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(build_resources(&dataset, needs_gradient))?;
    if let Some(overlay) = &overlay_dataset {
        runtime.block_on(build_resources(overlay, needs_gradient))?;
    }

    // Assemble the scene.
    let mut scene = VolumeScene::from_dataset(&dataset, transfer_function)?;
    if let Some(overlay) = &overlay_dataset {
        scene = scene.with_secondary(VolumeLayer::from_dataset(
            overlay,
            secondary_transfer_function(),
        )?);
    }
    if options.shadow.enabled {
        let start_time = Instant::now();
        let layer = scene.primary();
        let shadow = ShadowVolume::compute(
            layer.density(),
            layer.gradient(),
            layer.transfer_function(),
            options.lighting.light_direction,
            SHADOW_RESOLUTION_DIVISOR,
        );
        log::info!(
            "Computed shadow volume ({:.3} s)",
            start_time.elapsed().as_secs_f32()
        );
        scene = scene.with_shadow(Arc::new(shadow));
    }

    // Render.
    let projection = if args.fov > 0.0 {
        Projection::Perspective {
            fov_y: euclid::Angle::degrees(args.fov),
        }
    } else {
        Projection::Orthographic { half_height: 1.0 }
    };
    let camera = Camera::framing(
        dataset.transform(),
        WorldVector::from(args.view.0),
        projection,
        args.size.0,
    );
    let start_time = Instant::now();
    let image = VolumeRenderer::new(camera).render(&scene, &options);
    log::info!(
        "Rendered {}×{} image ({:.3} s)",
        image.size.width,
        image.size.height,
        start_time.elapsed().as_secs_f32()
    );

    write_png(&args.output, &image)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!("{}", image.info);
    println!("Resource builds: {}", dataset.build_times());
    Ok(())
}

fn read_options_file(path: &std::path::Path) -> Result<RenderOptions, anyhow::Error> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid rendering options in {}", path.display()))
}

/// Makes a single-channel volume out of the second channel of `source`.
fn second_channel_as_volume(source: &RawDensityArrays) -> Option<RawDensityArrays> {
    let secondary = source.secondary()?;
    Some(
        RawDensityArrays::new(source.size(), secondary)
            .with_voxel_spacing(source.voxel_spacing()),
    )
}

fn report_dataset(dataset: &Dataset, histogram_bins: Option<usize>) {
    let size = dataset.size();
    let range = dataset.value_range();
    println!(
        "Dataset: {}×{}×{} voxels, {} channel(s), values {range}",
        size.width,
        size.height,
        size.depth,
        dataset.channel_count(),
    );
    if let Some(range) = dataset.secondary_value_range() {
        println!("Second channel: values {range}");
    }

    let Some(bins) = histogram_bins.filter(|&bins| bins > 0) else {
        return;
    };
    let counts = histogram(dataset.primary().as_linear(), range, bins);
    let bin_width = range.range() / bins as f32;
    let max_count = counts.iter().copied().max().unwrap_or(0).max(1);
    for (i, count) in counts.into_iter().enumerate() {
        let low = range.min as f32 + bin_width * i as f32;
        let bar_length = (count * 40).div_ceil(max_count) as usize;
        println!("{low:>10.1} {count:>10} {}", "#".repeat(bar_length));
    }
}

async fn build_resources(dataset: &Dataset, gradient: bool) -> Result<(), anyhow::Error> {
    let bar = new_progress_bar("density");
    dataset
        .density_resource(yield_progress_for_bar(&bar))
        .await
        .context("failed to build density resource")?;
    bar.finish();

    if gradient {
        let bar = new_progress_bar("gradient");
        dataset
            .gradient_resource(yield_progress_for_bar(&bar))
            .await
            .context("failed to build gradient resource")?;
        bar.finish();
        if let Some(max) = dataset.gradient_max() {
            log::debug!("gradient maximum {max}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_channel_extraction() {
        let size = euclid::size3(2, 1, 1);
        let source = RawDensityArrays::new(size, vec![1, 2]).with_secondary(vec![3, 4]);
        let second = second_channel_as_volume(&source).unwrap();
        assert_eq!(second.primary(), &[3, 4]);
        assert_eq!(second.secondary(), None);
        assert!(second_channel_as_volume(&second).is_none());
    }

    #[test]
    fn options_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(
            &path,
            r#"{"mode": "Mip", "max_steps": 64, "interpolation": "Tricubic"}"#,
        )
        .unwrap();
        let options = read_options_file(&path).unwrap();
        assert_eq!(options.mode, RenderMode::Mip);
        assert_eq!(options.max_steps, 64);
        assert_eq!(options.interpolation, volray_render::Interpolation::Tricubic);
        assert_eq!(options.intensity, RenderOptions::default().intensity);

        std::fs::write(&path, r#"{"mode": "Sideways"}"#).unwrap();
        let error = read_options_file(&path).unwrap_err();
        assert!(
            error.to_string().starts_with("invalid rendering options in"),
            "{error}"
        );
    }

    #[test]
    fn presets_match_channel_needs() {
        use command_options::TransferArg;
        use volray_render::TransferFunction;
        assert!(TransferArg::Boundary.build().needs_gradient());
        assert_eq!(TransferArg::Dual.build().channel_count(), 2);
        assert!(matches!(TransferArg::Ramp.build(), TransferFunction::OneD(_)));
    }
}
