//! Blur detection module.
//!
//! - [`sharpness`]: Laplacian variance and Tenengrad scoring, whole or tiled
//! - [`classifier`]: Threshold policy and severity tiers
//! - [`detector`]: Walk, parallel scoring and relocation

pub mod classifier;
pub mod detector;
pub mod sharpness;

pub use classifier::{classify, BlurThresholds, BlurVerdict, Severity};
pub use detector::{BlurDetector, DetectorConfig, DetectorError, DetectorSummary};
pub use sharpness::{assess, Sharpness, SharpnessAssessment, SharpnessParams};
