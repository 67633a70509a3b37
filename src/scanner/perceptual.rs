//! Perceptual fingerprints for near-duplicate detection.
//!
//! [`FingerprintEngine`] wraps an `image_hasher` pHash configuration (DCT
//! preprocessing, median threshold, 8×8 bits) and produces 64-bit
//! fingerprints that stay close under rescaling and recompression.
//! Fingerprints travel and persist as 16 lowercase hex characters.
//!
//! [`distance`] compares two such strings. It parses them as structured
//! hashes first; if that fails it falls back to an exact bit comparison of
//! the strings read as base-16 integers, zero-padded to 64 bits.

use image::RgbImage;
use image_hasher::{HashAlg, HasherConfig, ImageHash};
use thiserror::Error;

/// Bit length of every fingerprint.
pub const FINGERPRINT_BITS: u32 = 64;

const FINGERPRINT_BYTES: usize = (FINGERPRINT_BITS / 8) as usize;

/// Errors that can occur while computing or comparing fingerprints.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FingerprintError {
    /// The pixel grid has no pixels.
    #[error("Cannot fingerprint an empty image ({0}x{1})")]
    EmptyImage(u32, u32),

    /// The hasher produced an unexpected number of bits.
    #[error("Fingerprint has {0} bytes, expected 8")]
    UnexpectedLength(usize),

    /// A stored fingerprint could not be interpreted at all.
    #[error("Invalid fingerprint: {0:?}")]
    Invalid(String),
}

/// Computes 64-bit perceptual fingerprints.
pub struct FingerprintEngine {
    hasher: image_hasher::Hasher,
}

impl FingerprintEngine {
    /// Create the pHash engine.
    #[must_use]
    pub fn new() -> Self {
        let hasher = HasherConfig::new()
            .hash_size(8, 8)
            .hash_alg(HashAlg::Median)
            .preproc_dct()
            .to_hasher();

        Self { hasher }
    }

    /// Fingerprint a decoded pixel grid, returning its hex form.
    ///
    /// # Errors
    ///
    /// Returns a [`FingerprintError`] for empty images or an unexpected
    /// hash length.
    pub fn fingerprint(&self, pixels: &RgbImage) -> Result<String, FingerprintError> {
        let (w, h) = pixels.dimensions();
        if w == 0 || h == 0 {
            return Err(FingerprintError::EmptyImage(w, h));
        }

        let hash = self.hasher.hash_image(pixels);
        let bytes = hash.as_bytes();
        if bytes.len() != FINGERPRINT_BYTES {
            return Err(FingerprintError::UnexpectedLength(bytes.len()));
        }

        Ok(to_hex(bytes))
    }
}

impl Default for FingerprintEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Structured parse: exactly 16 hex characters into an `ImageHash`.
fn parse_structured(hex: &str) -> Option<ImageHash> {
    if hex.len() != FINGERPRINT_BYTES * 2 || !is_hex(hex) {
        return None;
    }

    let bytes: Option<Vec<u8>> = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect();

    ImageHash::<Box<[u8]>>::from_bytes(&bytes?).ok()
}

/// Fallback parse: the whole string as one base-16 integer of at most 64 bits.
fn parse_bits(hex: &str) -> Result<u64, FingerprintError> {
    let digits = hex.trim();
    if !is_hex(digits) {
        return Err(FingerprintError::Invalid(hex.to_string()));
    }
    u64::from_str_radix(digits, 16).map_err(|_| FingerprintError::Invalid(hex.to_string()))
}

/// Non-empty and made of hex digits only; `from_str_radix` would also take a sign.
fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Hamming distance between two hex-encoded fingerprints.
///
/// The result lies in `[0, 64]`, is symmetric, and is zero for identical
/// inputs.
///
/// # Errors
///
/// Returns [`FingerprintError::Invalid`] when a value is neither a
/// structured fingerprint nor a base-16 integer that fits in 64 bits.
///
/// # Example
///
/// ```
/// use picsift::scanner::distance;
///
/// assert_eq!(distance("00000000000000ff", "0000000000000000").unwrap(), 8);
/// // Short forms are compared as zero-padded 64-bit values.
/// assert_eq!(distance("ff", "00000000000000ff").unwrap(), 0);
/// ```
pub fn distance(a: &str, b: &str) -> Result<u32, FingerprintError> {
    if let (Some(ha), Some(hb)) = (parse_structured(a), parse_structured(b)) {
        return Ok(ha.dist(&hb));
    }

    let (x, y) = (parse_bits(a)?, parse_bits(b)?);
    Ok((x ^ y).count_ones())
}
