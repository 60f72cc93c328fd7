//! Loading headerless binary volume files.

use std::path::{Path, PathBuf};

use volray::math::{GridSize, WorldSize};
use volray::source::RawDensityArrays;

/// Encoding of each sample in a raw volume file.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, clap::ValueEnum)]
#[non_exhaustive]
pub enum SampleFormat {
    /// Unsigned 8-bit.
    #[default]
    U8,
    /// Unsigned 16-bit, little-endian.
    U16le,
    /// Unsigned 16-bit, big-endian.
    U16be,
    /// Signed 16-bit, little-endian (typical of CT scans in Hounsfield units).
    I16le,
    /// Signed 32-bit, little-endian.
    I32le,
}

impl SampleFormat {
    /// Number of bytes per sample.
    pub fn sample_bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16le | Self::U16be | Self::I16le => 2,
            Self::I32le => 4,
        }
    }

    /// Decodes a whole buffer of samples.
    ///
    /// Returns an error if `bytes` does not hold exactly `expected` samples.
    pub fn decode(self, bytes: &[u8], expected: usize) -> Result<Vec<i32>, DecodeError> {
        let sample_bytes = self.sample_bytes();
        if expected.checked_mul(sample_bytes) != Some(bytes.len()) {
            return Err(DecodeError {
                actual: bytes.len(),
                expected,
                format: self,
            });
        }
        let chunks = bytes.chunks_exact(sample_bytes);
        Ok(match self {
            Self::U8 => bytes.iter().map(|&b| i32::from(b)).collect(),
            Self::U16le => chunks
                .map(|c| i32::from(u16::from_le_bytes([c[0], c[1]])))
                .collect(),
            Self::U16be => chunks
                .map(|c| i32::from(u16::from_be_bytes([c[0], c[1]])))
                .collect(),
            Self::I16le => chunks
                .map(|c| i32::from(i16::from_le_bytes([c[0], c[1]])))
                .collect(),
            Self::I32le => chunks
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        })
    }
}

/// {actual} bytes is not {expected} samples of {format:?}
#[derive(Clone, Debug, Eq, PartialEq, displaydoc::Display)]
#[non_exhaustive]
pub struct DecodeError {
    /// Length of the data in bytes.
    pub actual: usize,
    /// Number of samples the dimensions call for.
    pub expected: usize,
    /// The sample format in use.
    pub format: SampleFormat,
}

impl std::error::Error for DecodeError {}

/// Error from [`load_raw()`].
#[derive(Debug)]
#[non_exhaustive]
pub enum RawError {
    /// failed to read {path}
    Read {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// failed to decode {path}
    Decode {
        /// The file whose contents were wrong.
        path: PathBuf,
        /// What was wrong with them.
        source: DecodeError,
    },
}

impl std::fmt::Display for RawError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawError::Read { path, .. } => write!(f, "failed to read {}", path.display()),
            RawError::Decode { path, .. } => write!(f, "failed to decode {}", path.display()),
        }
    }
}

impl std::error::Error for RawError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RawError::Read { source, .. } => Some(source),
            RawError::Decode { source, .. } => Some(source),
        }
    }
}

/// Description of a raw volume to load.
#[derive(Clone, Debug, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct RawVolume {
    /// File containing the first density channel.
    pub path: PathBuf,
    /// Optional file containing a second density channel of the same size and format.
    pub secondary_path: Option<PathBuf>,
    /// Dimensions of the voxel grid.
    pub size: GridSize,
    /// Sample encoding shared by both files.
    pub format: SampleFormat,
    /// Bytes to skip at the start of each file.
    pub header_bytes: usize,
    /// Physical extent of one voxel.
    pub voxel_spacing: WorldSize,
}

/// Reads the file(s) described by `volume`.
pub fn load_raw(volume: &RawVolume) -> Result<RawDensityArrays, RawError> {
    let expected =
        volume.size.width as usize * volume.size.height as usize * volume.size.depth as usize;
    let read_channel = |path: &Path| -> Result<Vec<i32>, RawError> {
        let bytes = std::fs::read(path).map_err(|source| RawError::Read {
            path: path.to_owned(),
            source,
        })?;
        let body = bytes.get(volume.header_bytes..).unwrap_or_default();
        volume
            .format
            .decode(body, expected)
            .map_err(|source| RawError::Decode {
                path: path.to_owned(),
                source,
            })
    };

    let mut arrays = RawDensityArrays::new(volume.size, read_channel(&volume.path)?)
        .with_voxel_spacing(volume.voxel_spacing);
    if let Some(secondary_path) = &volume.secondary_path {
        arrays = arrays.with_secondary(read_channel(secondary_path)?);
    }
    log::debug!(
        "loaded {} ({:?}, {}×{}×{})",
        volume.path.display(),
        volume.format,
        volume.size.width,
        volume.size.height,
        volume.size.depth,
    );
    Ok(arrays)
}
