//! Image decoding with ordered fallback strategies.
//!
//! [`StrategyDecoder`] tries, in order:
//!
//! 1. [`ReadMethod::Extension`]: `image::open`, format chosen from the file
//!    extension.
//! 2. [`ReadMethod::Sniffed`]: format guessed from the file's magic bytes,
//!    for files whose extension lies about their content.
//! 3. [`ReadMethod::EmbeddedPreview`]: the largest JPEG stream embedded in the
//!    file. Most camera-raw containers (CR2, NEF, ARW, DNG, ...) carry a
//!    full-size JPEG preview that is good enough for fingerprinting and
//!    sharpness scoring.
//!
//! Every successful strategy yields an 8-bit RGB pixel grid.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::{DynamicImage, ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JPEG start-of-image marker followed by the first marker prefix.
const JPEG_SOI: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Upper bound on embedded JPEG candidates tried per file.
const MAX_PREVIEW_CANDIDATES: usize = 16;

/// Which decoding strategy produced the pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadMethod {
    /// Decoded by the extension-selected codec.
    Extension,
    /// Decoded after sniffing the content format.
    Sniffed,
    /// Decoded from an embedded JPEG preview.
    EmbeddedPreview,
    /// No strategy succeeded.
    Fail,
}

impl ReadMethod {
    /// Stable name stored in the cache.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extension => "extension",
            Self::Sniffed => "sniffed",
            Self::EmbeddedPreview => "embedded_preview",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for ReadMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extension" => Ok(Self::Extension),
            "sniffed" => Ok(Self::Sniffed),
            "embedded_preview" => Ok(Self::EmbeddedPreview),
            "fail" => Ok(Self::Fail),
            other => Err(format!("unknown read method: {other}")),
        }
    }
}

/// A decoded pixel grid and the strategy that produced it.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixels: RgbImage,
    pub method: ReadMethod,
}

/// Errors that can occur while decoding.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The file could not be read at all.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every strategy failed.
    #[error("No decoding strategy succeeded for {0}")]
    Unreadable(PathBuf),
}

/// Decode capability handed to worker threads.
///
/// Implementations must be stateless from the caller's point of view: each
/// call receives only a path and returns a self-contained result.
pub trait ImageDecoder: Send + Sync {
    /// Decode `path` into an RGB pixel grid.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if no strategy produced pixels.
    fn decode(&self, path: &Path) -> Result<DecodedImage, DecodeError>;
}

/// Default decoder trying each [`ReadMethod`] strategy in order.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrategyDecoder;

impl StrategyDecoder {
    /// Create a new decoder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn by_extension(path: &Path) -> Option<DynamicImage> {
        match image::open(path) {
            Ok(img) => Some(img),
            Err(e) => {
                log::trace!("Extension decode failed for {}: {}", path.display(), e);
                None
            }
        }
    }

    fn by_content(bytes: &[u8]) -> Option<DynamicImage> {
        image::load_from_memory(bytes).ok()
    }

    /// Decode the largest embedded JPEG stream, if any.
    fn embedded_preview(bytes: &[u8]) -> Option<DynamicImage> {
        jpeg_offsets(bytes)
            .take(MAX_PREVIEW_CANDIDATES)
            .filter_map(|offset| {
                image::load_from_memory_with_format(&bytes[offset..], ImageFormat::Jpeg).ok()
            })
            .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()))
    }
}

impl ImageDecoder for StrategyDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage, DecodeError> {
        if let Some(img) = Self::by_extension(path) {
            return Ok(DecodedImage {
                pixels: img.to_rgb8(),
                method: ReadMethod::Extension,
            });
        }

        let bytes = std::fs::read(path).map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(img) = Self::by_content(&bytes) {
            return Ok(DecodedImage {
                pixels: img.to_rgb8(),
                method: ReadMethod::Sniffed,
            });
        }

        if let Some(img) = Self::embedded_preview(&bytes) {
            return Ok(DecodedImage {
                pixels: img.to_rgb8(),
                method: ReadMethod::EmbeddedPreview,
            });
        }

        Err(DecodeError::Unreadable(path.to_path_buf()))
    }
}

/// Offsets of every JPEG start-of-image marker in `bytes`.
fn jpeg_offsets(bytes: &[u8]) -> impl Iterator<Item = usize> + '_ {
    bytes
        .windows(JPEG_SOI.len())
        .enumerate()
        .filter(|(_, window)| *window == JPEG_SOI)
        .map(|(offset, _)| offset)
}
