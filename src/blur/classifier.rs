//! Blur classification policy.
//!
//! A region is blurry only when *both* scores fall below their thresholds;
//! either score alone above its threshold is enough to call it sharp. In
//! tiled mode the number of blurry tiles maps to a [`Severity`] tier.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::sharpness::{Sharpness, SharpnessAssessment};
use crate::config::BLURRY_DIR_NAME;

/// Score thresholds below which a region counts as blurry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlurThresholds {
    pub laplacian: f64,
    pub tenengrad: f64,
}

impl Default for BlurThresholds {
    fn default() -> Self {
        Self {
            laplacian: 100.0,
            tenengrad: 1000.0,
        }
    }
}

impl BlurThresholds {
    /// Whether `score` is below both thresholds.
    #[must_use]
    pub fn is_blurry(&self, score: &Sharpness) -> bool {
        score.laplacian_variance < self.laplacian && score.tenengrad < self.tenengrad
    }
}

/// How much of a tiled image is blurry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// 3 to 5 blurry tiles
    Partially,
    /// 6 to 8 blurry tiles
    Mostly,
    /// All 9 tiles blurry
    Completely,
}

impl Severity {
    /// Map a blurry-tile count to a tier, `None` below three tiles.
    #[must_use]
    pub fn from_blurry_tiles(count: usize) -> Option<Self> {
        match count {
            0..=2 => None,
            3..=5 => Some(Self::Partially),
            6..=8 => Some(Self::Mostly),
            _ => Some(Self::Completely),
        }
    }

    /// Subfolder of `blurry/` holding this tier.
    #[must_use]
    pub fn folder_name(self) -> &'static str {
        match self {
            Self::Partially => "partially_blurry",
            Self::Mostly => "mostly_blurry",
            Self::Completely => "completely_blurry",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder_name())
    }
}

/// Outcome for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlurVerdict {
    Clear,
    /// Whole-image mode hit
    Blurry,
    /// Tiled mode hit
    Partial { severity: Severity, blurry_tiles: usize },
}

impl BlurVerdict {
    /// Whether the image should be moved.
    #[must_use]
    pub fn is_flagged(&self) -> bool {
        !matches!(self, Self::Clear)
    }

    /// Destination folder under `workdir`, `None` for clear images.
    #[must_use]
    pub fn destination(&self, workdir: &Path) -> Option<PathBuf> {
        match self {
            Self::Clear => None,
            Self::Blurry => Some(workdir.join(BLURRY_DIR_NAME)),
            Self::Partial { severity, .. } => {
                Some(workdir.join(BLURRY_DIR_NAME).join(severity.folder_name()))
            }
        }
    }
}

/// Apply `thresholds` to an assessment.
#[must_use]
pub fn classify(assessment: &SharpnessAssessment, thresholds: &BlurThresholds) -> BlurVerdict {
    match assessment {
        SharpnessAssessment::Whole(score) => {
            if thresholds.is_blurry(score) {
                BlurVerdict::Blurry
            } else {
                BlurVerdict::Clear
            }
        }
        SharpnessAssessment::Tiled(tiles) => {
            let blurry_tiles = tiles.iter().filter(|t| thresholds.is_blurry(t)).count();
            match Severity::from_blurry_tiles(blurry_tiles) {
                Some(severity) => BlurVerdict::Partial {
                    severity,
                    blurry_tiles,
                },
                None => BlurVerdict::Clear,
            }
        }
    }
}
