//! Cache entry definitions.

use serde::{Deserialize, Serialize};

use crate::scanner::{FileEntry, ReadMethod};

/// One row of the fingerprint cache.
///
/// Created or overwritten whenever a file is (re)hashed. When the file is
/// relocated only `path` (and the re-read size/mtime) change; the fingerprint
/// stays with the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Path relative to the working directory (cache key)
    pub path: String,
    /// Hex fingerprint, absent when the file could not be read
    pub fingerprint: Option<String>,
    /// Decoding strategy that succeeded, or [`ReadMethod::Fail`]
    pub method: ReadMethod,
    /// File size in bytes at hash time
    pub size: u64,
    /// Modification time in seconds at hash time
    pub mtime: f64,
}

impl ImageRecord {
    /// Record for a file that was successfully fingerprinted.
    #[must_use]
    pub fn hashed(file: &FileEntry, fingerprint: String, method: ReadMethod) -> Self {
        Self {
            path: file.key.clone(),
            fingerprint: Some(fingerprint),
            method,
            size: file.size,
            mtime: file.mtime,
        }
    }

    /// Record for a file no strategy could fingerprint.
    #[must_use]
    pub fn unreadable(file: &FileEntry) -> Self {
        Self {
            path: file.key.clone(),
            fingerprint: None,
            method: ReadMethod::Fail,
            size: file.size,
            mtime: file.mtime,
        }
    }

    /// Record for a file that decoded via `method` but yielded no
    /// fingerprint.
    #[must_use]
    pub fn unhashed(file: &FileEntry, method: ReadMethod) -> Self {
        Self {
            path: file.key.clone(),
            fingerprint: None,
            method,
            size: file.size,
            mtime: file.mtime,
        }
    }

    /// Whether this record can take part in grouping.
    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.fingerprint.is_some()
    }
}

/// The subset of a row needed to decide freshness.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedMeta {
    pub size: u64,
    pub mtime: f64,
    pub fingerprint: Option<String>,
}
