//! Layered run settings.
//!
//! Settings are merged with `figment`, lowest priority first:
//!
//! 1. Built-in defaults ([`Settings::default`])
//! 2. The user config file (`<config dir>/picsift/config.toml`)
//! 3. `picsift.toml` inside the working directory
//! 4. `PICSIFT_*` environment variables
//! 5. Values given explicitly on the command line ([`Overrides`])
//!
//! The merged result is validated once, before any file is touched.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// SQLite cache file kept in each working directory.
pub const CACHE_FILE_NAME: &str = ".picsift_cache.db";

/// Append-only journal kept in each working directory.
pub const LOG_FILE_NAME: &str = "picsift.log";

/// Per-directory settings file.
pub const WORKDIR_CONFIG_NAME: &str = "picsift.toml";

/// Side-effect folder receiving near-duplicates.
pub const DUPLICATES_DIR_NAME: &str = "duplicates";

/// Side-effect folder receiving blurry images.
pub const BLURRY_DIR_NAME: &str = "blurry";

/// Largest meaningful Hamming distance for 64-bit fingerprints.
pub const MAX_THRESHOLD: i64 = 64;

/// Common raster and camera-raw extensions, lowercase without the dot.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "bmp", "gif", "tif", "tiff", "webp", "heic", "cr2", "nef", "arw", "dng",
    "orf", "rw2", "raf",
];

/// Effective settings for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Inclusive Hamming distance threshold for duplicate grouping.
    pub threshold: i64,
    /// Worker thread count.
    pub jobs: usize,
    /// Maximum recursion depth (root = 0).
    pub depth: usize,
    /// Laplacian variance below which a region may be blurry.
    pub lap_threshold: f64,
    /// Tenengrad score below which a region may be blurry.
    pub ten_threshold: f64,
    /// Fraction of height and width kept by the center crop.
    pub crop_fraction: f64,
    /// Images wider than this are downscaled before sharpness scoring.
    pub downscale_width: u32,
    /// Candidate file extensions.
    pub extensions: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threshold: 6,
            jobs: default_jobs(),
            depth: 5,
            lap_threshold: 100.0,
            ten_threshold: 1000.0,
            crop_fraction: 0.7,
            downscale_width: 800,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Host core count, falling back to a single worker.
#[must_use]
pub fn default_jobs() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Explicit command-line values. `None` leaves the lower layers in charge.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lap_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ten_threshold: Option<f64>,
}

impl Settings {
    /// Build the layered provider chain for `workdir`, without CLI overrides.
    #[must_use]
    pub fn figment(workdir: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(user_config) = user_config_path() {
            figment = figment.merge(Toml::file(user_config));
        }
        figment
            .merge(Toml::file(workdir.join(WORKDIR_CONFIG_NAME)))
            .merge(Env::prefixed("PICSIFT_"))
    }

    /// Load, override, and validate settings for `workdir`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a layer fails to parse or a value is out
    /// of range.
    pub fn load(workdir: &Path, overrides: &Overrides) -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment(workdir), overrides)
    }

    /// Extract settings from an arbitrary provider chain, then apply overrides.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if extraction or validation fails.
    pub fn from_figment(figment: Figment, overrides: &Overrides) -> Result<Self, ConfigError> {
        let settings: Settings = figment
            .merge(Serialized::defaults(overrides))
            .extract()
            .map_err(|e| ConfigError::Settings(Box::new(e)))?;
        settings.validate()?;
        Ok(settings.normalized())
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=MAX_THRESHOLD).contains(&self.threshold) {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        if !(self.crop_fraction > 0.0 && self.crop_fraction <= 1.0) {
            return Err(ConfigError::InvalidCropFraction(self.crop_fraction));
        }
        if self.jobs == 0 {
            return Err(ConfigError::InvalidJobs(self.jobs));
        }
        Ok(())
    }

    /// Threshold as an unsigned distance. Only meaningful after validation.
    #[must_use]
    pub fn hamming_threshold(&self) -> u32 {
        u32::try_from(self.threshold.clamp(0, MAX_THRESHOLD)).unwrap_or(0)
    }

    fn normalized(mut self) -> Self {
        self.extensions = self
            .extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }
}

/// Platform-specific user configuration file.
fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "picsift").map(|dirs| dirs.config_dir().join("config.toml"))
}
