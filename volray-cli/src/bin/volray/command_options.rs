//! Command line option parsing.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::Parser;
use clap::builder::TypedValueParser as _;

use volray::DatasetOptions;
use volray::gradient::GradientOperator;
use volray::math::{GridSize, GridSizeCoord, Rgb, Rgba, WorldSize};
use volray_cli::logging::LoggingArgs;
use volray_cli::phantom::Phantom;
use volray_cli::raw::{RawVolume, SampleFormat};
use volray_render::transfer::{
    TransferFunction1D, TransferFunction2D, TransferRegion, grayscale_ramp,
};
use volray_render::{
    ImageSize, Interpolation, MultiVolumeBlend, RenderMode, RenderOptions, TransferFunction,
};

#[derive(Clone, Debug, Parser)]
#[command(
    name = "volray", author, about, version,
    help_template = "\
{name} {version}
{about-with-newline}
{usage-heading}
    {usage}

{all-args}{after-help}",
)]
pub(crate) struct VolrayArgs {
    /// Synthetic dataset to render when no input file is given.
    #[arg(long = "phantom", short = 'p', value_enum, default_value = "sphere")]
    pub(crate) phantom: Phantom,

    /// Seed value for randomized phantoms.
    #[arg(long = "seed", default_value_t = 0)]
    pub(crate) seed: u64,

    /// Dimensions of the voxel grid: of the phantom to generate, or of the input file.
    #[arg(long = "dims", value_name = "X,Y,Z", default_value = "64,64,64")]
    pub(crate) dims: GridSizeArg,

    /// Headerless volume file to load, with samples in X-major order.
    ///
    /// Mutually exclusive with --phantom.
    #[arg(conflicts_with = "phantom", conflicts_with = "seed", value_name = "FILE")]
    pub(crate) input_file: Option<PathBuf>,

    /// Second density channel for the input file, with the same dimensions and format.
    #[arg(long = "secondary", value_name = "FILE", requires = "input_file")]
    pub(crate) secondary_file: Option<PathBuf>,

    /// Encoding of samples in the input file(s).
    #[arg(long = "format", value_enum, default_value = "u8")]
    pub(crate) format: SampleFormat,

    /// Bytes to skip at the start of the input file(s).
    #[arg(long = "header-bytes", value_name = "BYTES", default_value_t = 0)]
    pub(crate) header_bytes: usize,

    /// Physical extent of one voxel along each axis.
    #[arg(long = "spacing", value_name = "X,Y,Z", default_value = "1,1,1")]
    pub(crate) spacing: SpacingArg,

    /// Largest number of voxels allowed along any axis; larger datasets are downscaled.
    #[arg(long = "max-dimension", default_value_t = DatasetOptions::DEFAULT_MAX_DIMENSION)]
    pub(crate) max_dimension: GridSizeCoord,

    /// How gradients are computed.
    #[arg(long = "gradient", value_enum, default_value = "central-difference")]
    pub(crate) gradient: GradientArg,

    /// Print a histogram of the first channel with this many bins.
    #[arg(long = "histogram", value_name = "BINS")]
    pub(crate) histogram: Option<usize>,

    /// JSON file of rendering options to start from; other rendering arguments override it.
    #[arg(long = "options", value_name = "FILE")]
    pub(crate) options_file: Option<PathBuf>,

    /// Compositing mode.
    #[arg(long = "mode", short = 'm', value_enum)]
    pub(crate) mode: Option<ModeArg>,

    /// Maximum number of samples along a ray crossing the whole volume.
    #[arg(long = "steps")]
    pub(crate) steps: Option<u32>,

    /// Color multiplier.
    #[arg(long = "intensity")]
    pub(crate) intensity: Option<f32>,

    /// Normalized density below which samples are invisible.
    #[arg(long = "threshold")]
    pub(crate) threshold: Option<f32>,

    /// Normalized density window outside which samples are invisible.
    #[arg(long = "window", value_name = "MIN,MAX")]
    pub(crate) window: Option<RangeArg>,

    /// Range of the local Z axis that is rendered.
    #[arg(long = "slice", value_name = "MIN,MAX")]
    pub(crate) slice: Option<RangeArg>,

    /// Shade samples according to their gradients.
    #[arg(long = "lighting")]
    pub(crate) lighting: bool,

    /// Darken samples according to a shadow volume; the value is the strength, 0 to 1.
    #[arg(
        long = "shadow",
        value_name = "STRENGTH",
        num_args = 0..=1,
        default_missing_value = "0.7"
    )]
    pub(crate) shadow: Option<f32>,

    /// Skip ahead through empty space.
    #[arg(long = "adaptive")]
    pub(crate) adaptive: bool,

    /// Use tricubic instead of trilinear interpolation.
    #[arg(long = "tricubic")]
    pub(crate) tricubic: bool,

    /// Amount of per-pixel ray offset used to break up banding; 0 disables it.
    #[arg(long = "jitter")]
    pub(crate) jitter: Option<f32>,

    /// How the input's second channel combines with the first, as a separate volume.
    #[arg(long = "blend", value_enum)]
    pub(crate) blend: Option<BlendArg>,

    /// Transfer function preset.
    #[arg(long = "transfer", short = 't', value_enum, default_value = "ramp")]
    pub(crate) transfer: TransferArg,

    /// Direction from the volume toward the camera.
    #[arg(long = "view", value_name = "X,Y,Z", default_value = "0.5,0.4,1")]
    pub(crate) view: ViewArg,

    /// Vertical field of view in degrees; 0 selects orthographic projection.
    #[arg(long = "fov", default_value_t = 35.0)]
    pub(crate) fov: f64,

    /// Size of the output image.
    #[arg(long = "size", value_name = "W×H", default_value = "512×512")]
    pub(crate) size: DisplaySizeArg,

    /// Output PNG file.
    #[arg(
        long = "output",
        short = 'o',
        value_name = "FILE",
        value_parser = clap::builder::PathBufValueParser::new().try_map(|value| {
            check_output_path(&value)?;
            Ok::<PathBuf, &str>(value)
        }),
    )]
    pub(crate) output: PathBuf,

    #[command(flatten)]
    pub(crate) logging: LoggingArgs,
}

impl VolrayArgs {
    /// The raw file to load, if one was given.
    pub(crate) fn raw_volume(&self) -> Option<RawVolume> {
        Some(RawVolume {
            path: self.input_file.clone()?,
            secondary_path: self.secondary_file.clone(),
            size: self.dims.0,
            format: self.format,
            header_bytes: self.header_bytes,
            voxel_spacing: self.spacing.0,
        })
    }

    pub(crate) fn dataset_options(&self) -> DatasetOptions {
        let mut options = DatasetOptions::default();
        options.max_dimension = self.max_dimension;
        options.gradient_operator = self.gradient.into();
        options.repair()
    }

    /// Applies the rendering arguments that were given to `options`.
    pub(crate) fn apply_render_args(&self, mut options: RenderOptions) -> RenderOptions {
        if let Some(mode) = self.mode {
            options.mode = mode.into();
        }
        if let Some(steps) = self.steps {
            options.max_steps = steps;
        }
        if let Some(intensity) = self.intensity {
            options.intensity = intensity;
        }
        if let Some(threshold) = self.threshold {
            options.threshold = threshold;
        }
        if let Some(RangeArg(window)) = self.window {
            options.visibility_window = window.map(|v| v as f32);
        }
        if let Some(RangeArg(slice)) = self.slice {
            options.slice_window = slice;
        }
        if self.lighting {
            options.lighting.enabled = true;
        }
        if let Some(strength) = self.shadow {
            options.shadow.enabled = true;
            options.shadow.strength = strength;
        }
        if self.adaptive {
            options.adaptive.enabled = true;
        }
        if self.tricubic {
            options.interpolation = Interpolation::Tricubic;
        }
        if let Some(jitter) = self.jitter {
            options.jitter = jitter;
        }
        if let Some(blend) = self.blend {
            options.blend = blend.into();
        }
        if self.transfer == TransferArg::Boundary {
            // Only boundaries are opaque, so the first sample with a gradient is the one.
            options.surface_gradient_threshold = options.surface_gradient_threshold.max(0.05);
        }
        options.repair()
    }
}

/// Checks that the output file is one we know how to write.
fn check_output_path(path: &Path) -> Result<(), &'static str> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png" | "PNG") => Ok(()),
        _ => Err("output file name must end in '.png'"),
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub(crate) enum ModeArg {
    /// Direct volume rendering.
    Dvr,
    /// Maximum-intensity projection.
    Mip,
    /// First-hit surface.
    Surface,
}

impl From<ModeArg> for RenderMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Dvr => RenderMode::Dvr,
            ModeArg::Mip => RenderMode::Mip,
            ModeArg::Surface => RenderMode::Surface,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub(crate) enum GradientArg {
    CentralDifference,
    Sobel,
    SmoothedCentralDifference,
    SmoothedSobel,
}

impl From<GradientArg> for GradientOperator {
    fn from(value: GradientArg) -> Self {
        match value {
            GradientArg::CentralDifference => GradientOperator::CentralDifference,
            GradientArg::Sobel => GradientOperator::Sobel,
            GradientArg::SmoothedCentralDifference => GradientOperator::SmoothedCentralDifference,
            GradientArg::SmoothedSobel => GradientOperator::SmoothedSobel,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub(crate) enum BlendArg {
    /// The second channel is drawn in place of the first wherever it is visible.
    Overlay,
    /// The first channel is drawn only where the second is visible.
    Isolate,
}

impl From<BlendArg> for MultiVolumeBlend {
    fn from(value: BlendArg) -> Self {
        match value {
            BlendArg::Overlay => MultiVolumeBlend::Overlay,
            BlendArg::Isolate => MultiVolumeBlend::Isolate,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub(crate) enum TransferArg {
    /// Grayscale, with opacity equal to density.
    Ramp,
    /// Transparent soft tissue, ivory bone.
    Bone,
    /// Opaque only where density changes sharply (needs gradients).
    Boundary,
    /// Red for the first channel and green for the second (needs two channels).
    Dual,
}

impl TransferArg {
    pub(crate) fn build(self) -> TransferFunction {
        match self {
            TransferArg::Ramp => TransferFunction::OneD(grayscale_ramp()),
            TransferArg::Bone => TransferFunction::OneD(bone()),
            TransferArg::Boundary => {
                TransferFunction::TwoD(TransferFunction2D::from_regions(&[TransferRegion {
                    density: [0.05, 1.0],
                    gradient: [0.05, 1.0],
                    color: Rgb::new(0.9, 0.85, 0.75).with_alpha(0.6),
                }]))
            }
            TransferArg::Dual => TransferFunction::Dual {
                red: tinted_ramp(Rgb::new(1.0, 0.1, 0.1)),
                green: tinted_ramp(Rgb::new(0.1, 1.0, 0.1)),
            },
        }
    }
}

/// Transfer function for the second volume when `--blend` is used.
pub(crate) fn secondary_transfer_function() -> TransferFunction {
    TransferFunction::OneD(tinted_ramp(Rgb::new(0.2, 0.9, 0.3)))
}

fn bone() -> TransferFunction1D {
    TransferFunction1D::from_control_points(&[
        (0.0, Rgba::TRANSPARENT),
        (0.2, Rgb::new(0.6, 0.2, 0.15).with_alpha(0.0)),
        (0.3, Rgb::new(0.8, 0.4, 0.3).with_alpha(0.05)),
        (0.5, Rgb::new(1.0, 0.95, 0.85).with_alpha(0.6)),
        (1.0, Rgb::new(1.0, 1.0, 0.95).with_alpha(0.9)),
    ])
    .unwrap_or_else(grayscale_ramp)
}

fn tinted_ramp(tint: Rgb) -> TransferFunction1D {
    TransferFunction1D::from_fn(|d| (tint * d).with_alpha(d))
}

// -------------------------------------------------------------------------------------------------

/// Splits `s` into exactly `N` numbers.
fn parse_list<T: FromStr, const N: usize>(s: &str, what: &str) -> Result<[T; N], String> {
    s.split(&['×', 'x', ',', ';', ' '][..])
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<T>()
                .map_err(|_| format!("{part:?} is not a valid number"))
        })
        .collect::<Result<Vec<T>, String>>()?
        .try_into()
        .map_err(|_| format!("must be {what}"))
}

/// Image size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct DisplaySizeArg(pub ImageSize);

impl FromStr for DisplaySizeArg {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dims: [u32; 2] = parse_list(s, "two positive integers")?;
        if dims.contains(&0) {
            return Err(String::from("must be two positive integers"));
        }
        Ok(DisplaySizeArg(ImageSize::from(dims)))
    }
}

/// Voxel grid dimensions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct GridSizeArg(pub GridSize);

impl FromStr for GridSizeArg {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dims: [GridSizeCoord; 3] = parse_list(s, "three positive integers")?;
        if dims.contains(&0) {
            return Err(String::from("must be three positive integers"));
        }
        Ok(GridSizeArg(GridSize::from(dims)))
    }
}

/// Voxel spacing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SpacingArg(pub WorldSize);

impl FromStr for SpacingArg {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dims: [f64; 3] = parse_list(s, "three positive numbers")?;
        if !dims.iter().all(|&d| d.is_finite() && d > 0.0) {
            return Err(String::from("must be three positive numbers"));
        }
        Ok(SpacingArg(WorldSize::from(dims)))
    }
}

/// View direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ViewArg(pub [f64; 3]);

impl FromStr for ViewArg {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v: [f64; 3] = parse_list(s, "three numbers")?;
        let square_length: f64 = v.iter().map(|c| c * c).sum();
        if !(square_length.is_finite() && square_length > 0.0) {
            return Err(String::from("must be three numbers, not all zero"));
        }
        Ok(ViewArg(v))
    }
}

/// A `min,max` pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct RangeArg(pub [f64; 2]);

impl FromStr for RangeArg {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Space is not a separator here so that negative numbers read naturally.
        let [min, max]: [f64; 2] = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .map_err(|_| format!("{part:?} is not a number"))
            })
            .collect::<Result<Vec<f64>, String>>()?
            .try_into()
            .map_err(|_| String::from("must be two numbers, MIN,MAX"))?;
        Ok(RangeArg([min, max]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::{size2, size3};
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> clap::error::Result<VolrayArgs> {
        VolrayArgs::try_parse_from(std::iter::once("volray").chain(args.iter().copied()))
    }

    #[test]
    fn minimal() {
        let args = parse(&["-o", "out.png"]).unwrap();
        assert_eq!(args.phantom, Phantom::Sphere);
        assert_eq!(args.dims, GridSizeArg(size3(64, 64, 64)));
        assert_eq!(args.size, DisplaySizeArg(size2(512, 512)));
        assert_eq!(args.output, PathBuf::from("out.png"));
        assert!(args.raw_volume().is_none());
        assert_eq!(args.apply_render_args(RenderOptions::default()), RenderOptions::default());
    }

    #[test]
    fn output_must_be_png() {
        let error = parse(&["-o", "out.jpg"]).unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn input_file_conflicts_with_phantom() {
        let error = parse(&["-o", "out.png", "--phantom", "blobs", "in.raw"]).unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::ArgumentConflict);

        let args =
            parse(&["-o", "out.png", "in.raw", "--dims", "4×5×6", "--format", "i16le"]).unwrap();
        let raw = args.raw_volume().unwrap();
        assert_eq!(raw.path, PathBuf::from("in.raw"));
        assert_eq!(raw.size, size3(4, 5, 6));
        assert_eq!(raw.format, SampleFormat::I16le);
    }

    #[test]
    fn render_args_override_options() {
        let args = parse(&[
            "-o", "out.png", "--mode", "mip", "--steps", "300", "--window", "0.2,0.9",
            "--shadow", "--tricubic", "--adaptive",
        ])
        .unwrap();
        let options = args.apply_render_args(RenderOptions::default());
        assert_eq!(options.mode, RenderMode::Mip);
        assert_eq!(options.max_steps, 300);
        assert_eq!(options.visibility_window, [0.2, 0.9]);
        assert!(options.shadow.enabled);
        assert_eq!(options.shadow.strength, 0.7);
        assert_eq!(options.interpolation, Interpolation::Tricubic);
        assert!(options.adaptive.enabled);
    }

    #[test]
    fn size_formats() {
        for s in ["640×480", "640x480", "640,480", "640 480"] {
            assert_eq!(
                DisplaySizeArg::from_str(s),
                Ok(DisplaySizeArg(size2(640, 480))),
                "{s}"
            );
        }
        assert_eq!(
            DisplaySizeArg::from_str("640"),
            Err(String::from("must be two positive integers"))
        );
        assert_eq!(
            GridSizeArg::from_str("1,0,1"),
            Err(String::from("must be three positive integers"))
        );
    }
}
