//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Seed-centric grouping of perceptual fingerprints
//! - The incremental hashing pipeline and keeper selection

pub mod finder;
pub mod groups;

pub use finder::{DuplicateFinder, FinderConfig, FinderError, FinderSummary};
pub use groups::{group_duplicates, DuplicateGroup};
