//! Scanner module for directory traversal, decoding, and fingerprinting.
//!
//! This module provides functionality for:
//! - Depth-bounded directory walking using jwalk, pruning side-effect folders
//! - Relative, NFC-normalized cache keys for discovered files
//! - Multi-strategy image decoding
//! - 64-bit perceptual fingerprints and their Hamming distance
//!
//! # Architecture
//!
//! - [`walker`]: Directory traversal and candidate discovery
//! - [`path_utils`]: Cache key derivation
//! - [`decoder`]: Decode strategies behind the [`ImageDecoder`] trait
//! - [`perceptual`]: Fingerprint engine and distance
//!
//! # Example
//!
//! ```no_run
//! use picsift::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/photos"), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.key, file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod decoder;
pub mod path_utils;
pub mod perceptual;
pub mod walker;

use std::fs::Metadata;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use crate::config::{BLURRY_DIR_NAME, DEFAULT_EXTENSIONS, DUPLICATES_DIR_NAME};

// Re-export main types
pub use decoder::{DecodeError, DecodedImage, ImageDecoder, ReadMethod, StrategyDecoder};
pub use perceptual::{distance, FingerprintEngine, FingerprintError, FINGERPRINT_BITS};
pub use walker::Walker;

/// A candidate image discovered by the walker.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    /// Absolute path to the file, as found on disk
    pub path: PathBuf,
    /// Cache key: path relative to the working directory
    pub key: String,
    /// File size in bytes
    pub size: u64,
    /// Modification time in seconds since the Unix epoch
    pub mtime: f64,
}

impl FileEntry {
    /// Create a new FileEntry.
    #[must_use]
    pub fn new(path: PathBuf, key: String, size: u64, mtime: f64) -> Self {
        Self {
            path,
            key,
            size,
            mtime,
        }
    }
}

/// Modification time of `metadata` as floating-point seconds since the epoch.
///
/// Times before the epoch are returned as negative values; a platform without
/// modification times yields `0.0`.
#[must_use]
pub fn mtime_seconds(metadata: &Metadata) -> f64 {
    match metadata.modified() {
        Ok(modified) => match modified.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs_f64(),
            Err(e) => -e.duration().as_secs_f64(),
        },
        Err(_) => 0.0,
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Deepest directory level whose files are enumerated (root = 0).
    pub max_depth: usize,

    /// Candidate extensions, lowercase without the dot.
    pub extensions: Vec<String>,

    /// Directory names pruned at every level.
    pub excluded_dirs: Vec<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
            excluded_dirs: vec![DUPLICATES_DIR_NAME.to_string(), BLURRY_DIR_NAME.to_string()],
        }
    }
}

impl WalkerConfig {
    /// Create a configuration with the default side-effect exclusions.
    #[must_use]
    pub fn new(max_depth: usize, extensions: Vec<String>) -> Self {
        Self {
            max_depth,
            extensions,
            ..Default::default()
        }
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
