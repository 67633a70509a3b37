//! picsift - Near-duplicate and blur sifter for photo folders
//!
//! A Rust CLI application that fingerprints images with a perceptual hash,
//! moves all but the sharpest of each near-duplicate group into a
//! `duplicates/` folder, and moves blurry images into `blurry/` folders.
//! A per-folder SQLite cache keeps repeated runs incremental.

pub mod actions;
pub mod blur;
pub mod cache;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod progress;
pub mod scanner;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use bytesize::ByteSize;
use yansi::Paint;

use crate::blur::{BlurDetector, DetectorConfig, DetectorSummary, Severity};
use crate::cache::HashCache;
use crate::cli::{BlurArgs, Cli, Commands, DupesArgs};
use crate::config::{Settings, CACHE_FILE_NAME};
use crate::duplicates::{DuplicateFinder, FinderConfig, FinderSummary};
use crate::error::{ConfigError, ExitCode};
use crate::logging::RunLog;
use crate::progress::{Progress, ProgressCallback};

/// Run the application for parsed CLI arguments.
///
/// Console logging must already be initialized.
///
/// # Errors
///
/// Returns an error for configuration problems (see
/// [`error::exit_code_for`]) and for environment failures such as an
/// unopenable cache or journal.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    if cli.no_color {
        yansi::disable();
    }

    match cli.command {
        Commands::Dupes(args) => run_dupes(&args, cli.quiet),
        Commands::Blur(args) => run_blur(&args, cli.quiet),
    }
}

fn run_dupes(args: &DupesArgs, quiet: bool) -> anyhow::Result<ExitCode> {
    let workdir = resolve_workdir(&args.common.working_dir)?;
    let settings = Settings::load(&workdir, &args.overrides())?;
    log::debug!("Effective settings: {:?}", settings);

    let mut journal = open_journal(&workdir)?;
    let cache_path = workdir.join(CACHE_FILE_NAME);
    let mut cache = HashCache::open(&cache_path)
        .with_context(|| format!("Failed to open cache {}", cache_path.display()))?;

    let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::new(quiet));
    let config = FinderConfig::from_settings(&settings)
        .with_force_rescan(args.force_rescan)
        .with_progress_callback(progress);

    let summary = DuplicateFinder::new(config).run(&workdir, &mut cache, &mut journal)?;
    print_dupes_summary(&summary, journal.path());
    Ok(ExitCode::Success)
}

fn run_blur(args: &BlurArgs, quiet: bool) -> anyhow::Result<ExitCode> {
    let workdir = resolve_workdir(&args.common.working_dir)?;
    let settings = Settings::load(&workdir, &args.overrides())?;
    log::debug!("Effective settings: {:?}", settings);

    let mut journal = open_journal(&workdir)?;

    // Blur runs never create a cache; they only keep an existing one in step.
    let cache_path = workdir.join(CACHE_FILE_NAME);
    let mut cache = if cache_path.is_file() {
        Some(
            HashCache::open(&cache_path)
                .with_context(|| format!("Failed to open cache {}", cache_path.display()))?,
        )
    } else {
        None
    };

    let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::new(quiet));
    let config = DetectorConfig::from_settings(&settings)
        .with_split_image(args.split_image)
        .with_progress_callback(progress);

    let summary = BlurDetector::new(config).run(&workdir, cache.as_mut(), &mut journal)?;
    print_blur_summary(&summary, journal.path());
    Ok(ExitCode::Success)
}

/// Absolute form of `path`, which must be an existing directory.
fn resolve_workdir(path: &Path) -> Result<PathBuf, ConfigError> {
    if !path.is_dir() {
        return Err(ConfigError::MissingDirectory(path.to_path_buf()));
    }
    path.canonicalize()
        .map_err(|_| ConfigError::MissingDirectory(path.to_path_buf()))
}

fn open_journal(workdir: &Path) -> anyhow::Result<RunLog> {
    RunLog::open(workdir)
        .with_context(|| format!("Failed to open log file in {}", workdir.display()))
}

fn print_dupes_summary(summary: &FinderSummary, journal: &Path) {
    println!(
        "{} Found {} duplicate group(s). Moved {} file(s) ({}).",
        "Done.".green().bold(),
        summary.groups.len().bold(),
        summary.moved.bold(),
        ByteSize::b(summary.moved_bytes)
    );
    println!(
        "  {} images, {} from cache, {} hashed, {} unreadable",
        summary.total_files, summary.cache_hits, summary.hashed, summary.unreadable
    );
    if summary.move_errors > 0 {
        println!("  {} move(s) failed", summary.move_errors.red().bold());
    }
    println!("See {} for details.", journal.display().dim());
}

fn print_blur_summary(summary: &DetectorSummary, journal: &Path) {
    println!(
        "{} Detected and moved {} blurry file(s) ({}).",
        "Done.".green().bold(),
        summary.moved.bold(),
        ByteSize::b(summary.moved_bytes)
    );
    println!(
        "  {} images scanned, {} unreadable",
        summary.total_files, summary.unreadable
    );
    for severity in [Severity::Partially, Severity::Mostly, Severity::Completely] {
        let count = summary.count_at(severity);
        if count > 0 {
            println!("  {}: {}", severity.yellow(), count);
        }
    }
    if summary.errors + summary.move_errors > 0 {
        println!(
            "  {} file(s) failed",
            (summary.errors + summary.move_errors).red().bold()
        );
    }
    println!("See {} for details.", journal.display().dim());
}
