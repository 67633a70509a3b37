//! Logging infrastructure for picsift.
//!
//! Two sinks live here:
//!
//! - Console diagnostics through the `log` facade and the `env_logger` backend.
//!   Levels are determined by (in priority order) `RUST_LOG`, then `--quiet`
//!   (error only) or `--verbose` (debug/trace), then info.
//! - [`RunLog`], the append-only journal kept inside the working directory.
//!   Every scan start, per-file read result, move, and summary lands there with
//!   a local timestamp. It is opened once per run and written only by the
//!   orchestrating thread.
//!
//! # Example
//!
//! ```rust,no_run
//! use picsift::logging::{init_logging, RunLog};
//! use std::path::Path;
//!
//! init_logging(0, false);
//!
//! let mut journal = RunLog::open(Path::new("/photos")).unwrap();
//! journal.record("Starting scan");
//! ```

use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use env_logger::Builder;
use log::LevelFilter;

use crate::config::LOG_FILE_NAME;

/// Initialize the console logging subsystem based on CLI verbosity flags.
///
/// # Priority
///
/// 1. If `RUST_LOG` environment variable is set, it takes precedence
/// 2. If `quiet` is true: Error level only
/// 3. If `verbose >= 2`: Trace level
/// 4. If `verbose == 1`: Debug level
/// 5. Default: Info level
///
/// # Panics
///
/// This function will panic if called more than once, as `env_logger`
/// can only be initialized once per process.
pub fn init_logging(verbose: u8, quiet: bool) {
    let use_env = std::env::var("RUST_LOG").is_ok();

    let mut builder = Builder::new();

    if use_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }

    configure_format(&mut builder, verbose);
    builder.init();

    log::debug!("Logging initialized at level: {:?}", log::max_level());
}

/// Determine the log level from CLI flags.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Configure the console format based on build type and verbosity.
///
/// - Debug builds: timestamp, level, and module path once `-v` is given
/// - Release builds: compact format (level + message only)
fn configure_format(builder: &mut Builder, verbose: u8) {
    #[cfg(debug_assertions)]
    {
        builder.format(move |buf, record| {
            let timestamp = buf.timestamp_seconds();
            let level = record.level();
            let level_style = buf.default_level_style(level);

            if verbose >= 1 {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} [{}] {}",
                    timestamp,
                    level,
                    record.module_path().unwrap_or("unknown"),
                    record.args()
                )
            } else {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} {}",
                    timestamp,
                    level,
                    record.args()
                )
            }
        });
    }

    #[cfg(not(debug_assertions))]
    {
        let _ = verbose;
        builder.format(|buf, record| {
            let level = record.level();
            let level_style = buf.default_level_style(level);
            writeln!(
                buf,
                "{level_style}{:<5}{level_style:#} {}",
                level,
                record.args()
            )
        });
    }
}

/// Append-only, timestamped journal stored in the working directory.
///
/// Each call to [`RunLog::record`] writes one `[YYYY-mm-dd HH:MM:SS] message`
/// line and mirrors it to `log::debug!`. A failed write is reported through
/// `log::warn!` and never aborts the run.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    /// Open (or create) the journal inside `workdir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or opened for append.
    /// Callers treat this as fatal.
    pub fn open(workdir: &Path) -> io::Result<Self> {
        Self::open_at(workdir.join(LOG_FILE_NAME))
    }

    /// Open (or create) a journal at an explicit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or opened for append.
    pub fn open_at(path: PathBuf) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    /// Path of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line.
    pub fn record(&mut self, message: impl Display) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        log::debug!("{}", message);
        if let Err(e) = writeln!(self.file, "[{}] {}", timestamp, message) {
            log::warn!("Failed to write to {}: {}", self.path.display(), e);
        }
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        let _ = self.file.flush();
    }
}
