//! Command-line interface definitions for picsift.
//!
//! This module defines all CLI arguments and subcommands using the clap
//! derive API. Global options control verbosity and color; each subcommand
//! runs one pipeline over a working directory.
//!
//! # Example
//!
//! ```bash
//! # Move near-duplicates aside, scanning two levels deep
//! picsift dupes -W ~/Pictures -R 2
//!
//! # Stricter matching, ignore the cache
//! picsift dupes -W ~/Pictures -T 3 --force-rescan
//!
//! # Sort blurry shots by how much of the frame is soft
//! picsift blur -W ~/Pictures -S --lap-thresh 80
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Overrides;

/// Recursion depth used when `-R` is given without a value.
pub const DEFAULT_RECURSION: &str = "5";

/// Sift a photo folder: set aside near-duplicates and blurry shots.
///
/// picsift never deletes anything. Flagged images are moved into
/// `duplicates/` or `blurry/` folders for review.
#[derive(Debug, Parser)]
#[command(name = "picsift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress bars and non-error logging
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Report fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Group near-duplicate images and move all but the sharpest aside
    Dupes(DupesArgs),
    /// Move blurry images into blurry/ folders
    Blur(BlurArgs),
}

/// Options shared by both subcommands.
#[derive(Debug, Args)]
pub struct CommonArgs {
    /// Directory containing the images
    #[arg(short = 'W', long = "working-dir", value_name = "DIR")]
    pub working_dir: PathBuf,

    /// Number of worker threads (default: number of CPUs)
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Scan subfolders up to DEPTH levels (default: 5; 0 = top level only)
    #[arg(
        short = 'R',
        long,
        value_name = "DEPTH",
        num_args = 0..=1,
        default_missing_value = DEFAULT_RECURSION
    )]
    pub recursive: Option<usize>,
}

/// Arguments for the dupes subcommand.
#[derive(Debug, Args)]
pub struct DupesArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Maximum Hamming distance between fingerprints (0-64, default: 6)
    #[arg(short = 'T', long, value_name = "N", allow_negative_numbers = true)]
    pub threshold: Option<i64>,

    /// Rehash every image, ignoring cached fingerprints
    #[arg(long)]
    pub force_rescan: bool,
}

/// Arguments for the blur subcommand.
#[derive(Debug, Args)]
pub struct BlurArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Laplacian variance threshold (default: 100.0)
    #[arg(long = "lap-thresh", value_name = "F")]
    pub lap_thresh: Option<f64>,

    /// Tenengrad threshold (default: 1000.0)
    #[arg(long = "ten-thresh", value_name = "F")]
    pub ten_thresh: Option<f64>,

    /// Split each image into a 3x3 grid to detect partial blur
    #[arg(short = 'S', long)]
    pub split_image: bool,
}

impl CommonArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            jobs: self.jobs,
            depth: self.recursive,
            ..Default::default()
        }
    }
}

impl DupesArgs {
    /// Explicit values to layer over the configuration files.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            threshold: self.threshold,
            ..self.common.overrides()
        }
    }
}

impl BlurArgs {
    /// Explicit values to layer over the configuration files.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            lap_threshold: self.lap_thresh,
            ten_threshold: self.ten_thresh,
            ..self.common.overrides()
        }
    }
}
