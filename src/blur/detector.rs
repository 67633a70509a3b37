//! Blur detection pipeline.
//!
//! Walks the working directory, scores every candidate on a rayon pool and,
//! after the pool has drained, moves flagged images into `blurry/` (or
//! `blurry/<severity>/` in tiled mode). Scores are not cached; a fingerprint
//! row for a moved file is carried to its new path when a cache is supplied.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use thiserror::Error;

use super::classifier::{classify, BlurThresholds, BlurVerdict, Severity};
use super::sharpness::{assess, SharpnessParams};
use crate::actions::relocate;
use crate::cache::HashCache;
use crate::config::{default_jobs, Settings, DEFAULT_EXTENSIONS};
use crate::logging::RunLog;
use crate::progress::ProgressCallback;
use crate::scanner::{DecodeError, FileEntry, ImageDecoder, StrategyDecoder, Walker, WalkerConfig};

/// Errors that abort a blur run.
#[derive(Debug, Error)]
pub enum DetectorError {
    /// The working directory does not exist or is not a directory.
    #[error("Working directory not found: {0}")]
    NotADirectory(PathBuf),

    /// The worker pool could not be created.
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Configuration for the blur detector.
#[derive(Clone)]
pub struct DetectorConfig {
    pub thresholds: BlurThresholds,
    pub params: SharpnessParams,
    /// Score a 3×3 grid instead of the whole image.
    pub split_image: bool,
    pub jobs: usize,
    /// Maximum recursion depth (root = 0).
    pub max_depth: usize,
    pub extensions: Vec<String>,
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for DetectorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorConfig")
            .field("thresholds", &self.thresholds)
            .field("params", &self.params)
            .field("split_image", &self.split_image)
            .field("jobs", &self.jobs)
            .field("max_depth", &self.max_depth)
            .field("extensions", &self.extensions)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            thresholds: BlurThresholds::default(),
            params: SharpnessParams::default(),
            split_image: false,
            jobs: default_jobs(),
            max_depth: 5,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
            progress_callback: None,
        }
    }
}

impl DetectorConfig {
    /// Build a configuration from validated settings.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            thresholds: BlurThresholds {
                laplacian: settings.lap_threshold,
                tenengrad: settings.ten_threshold,
            },
            params: SharpnessParams {
                crop_fraction: settings.crop_fraction,
                downscale_width: settings.downscale_width,
            },
            jobs: settings.jobs,
            max_depth: settings.depth,
            extensions: settings.extensions.clone(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_split_image(mut self, split: bool) -> Self {
        self.split_image = split;
        self
    }

    #[must_use]
    pub fn with_thresholds(mut self, thresholds: BlurThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }
}

/// Outcome of a blur run.
#[derive(Debug, Clone, Default)]
pub struct DetectorSummary {
    /// Candidate files found by the walk
    pub total_files: usize,
    /// Files decoded and scored
    pub scored: usize,
    /// Files no strategy could read
    pub unreadable: usize,
    /// Files that could not be read from disk at all
    pub errors: usize,
    /// Flagged files and their verdicts, in walk order
    pub flagged: Vec<(String, BlurVerdict)>,
    /// Files relocated into `blurry/`
    pub moved: usize,
    /// Bytes relocated into `blurry/`
    pub moved_bytes: u64,
    /// Relocations that failed
    pub move_errors: usize,
    /// Wall time of the run
    pub duration: Duration,
}

impl DetectorSummary {
    /// Number of flagged files at `severity`.
    #[must_use]
    pub fn count_at(&self, severity: Severity) -> usize {
        self.flagged
            .iter()
            .filter(|(_, v)| matches!(v, BlurVerdict::Partial { severity: s, .. } if *s == severity))
            .count()
    }
}

/// Worker result for one file.
enum Scored {
    Verdict(BlurVerdict),
    Unreadable,
    Failed(String),
}

/// Blur detection pipeline.
pub struct BlurDetector {
    config: DetectorConfig,
    decoder: Arc<dyn ImageDecoder>,
}

impl BlurDetector {
    /// Create a detector using the default decode strategies.
    #[must_use]
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            decoder: Arc::new(StrategyDecoder::new()),
        }
    }

    /// Replace the decoder handed to workers.
    #[must_use]
    pub fn with_decoder(mut self, decoder: Arc<dyn ImageDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Run the pipeline on `workdir`.
    ///
    /// When `cache` is given, fingerprint rows of moved files follow them.
    ///
    /// # Errors
    ///
    /// Returns a [`DetectorError`] if the directory is missing or the worker
    /// pool cannot be built. Per-file failures are journaled and counted.
    pub fn run(
        &self,
        workdir: &Path,
        mut cache: Option<&mut HashCache>,
        log: &mut RunLog,
    ) -> Result<DetectorSummary, DetectorError> {
        let start = Instant::now();
        let mut summary = DetectorSummary::default();

        if !workdir.is_dir() {
            return Err(DetectorError::NotADirectory(workdir.to_path_buf()));
        }

        log.record(format!(
            "Starting blurry image scan. jobs={}, recursive_depth={}, lap_thresh={}, ten_thresh={}, split_image={}",
            self.config.jobs,
            self.config.max_depth,
            self.config.thresholds.laplacian,
            self.config.thresholds.tenengrad,
            self.config.split_image
        ));

        let files = self.walk(workdir);
        summary.total_files = files.len();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.jobs)
            .build()?;
        let results = self.score_files(&pool, &files);

        for (file, scored) in files.iter().zip(results) {
            match scored {
                Scored::Verdict(verdict) => {
                    summary.scored += 1;
                    if let Some(dest_dir) = verdict.destination(workdir) {
                        summary.flagged.push((file.key.clone(), verdict));
                        self.move_flagged(workdir, file, &dest_dir, cache.as_deref_mut(), log, &mut summary);
                    }
                }
                Scored::Unreadable => {
                    summary.unreadable += 1;
                    log.record(format!("UNREADABLE: {}", file.key));
                }
                Scored::Failed(message) => {
                    summary.errors += 1;
                    log.record(format!("ERROR processing {}: {}", file.key, message));
                }
            }
        }

        log.record(format!(
            "Blur scan complete. scanned={}, flagged={}, moved={}",
            summary.total_files,
            summary.flagged.len(),
            summary.moved
        ));
        summary.duration = start.elapsed();
        Ok(summary)
    }

    fn walk(&self, workdir: &Path) -> Vec<FileEntry> {
        self.notify_start("walking", 0);
        let walker = Walker::new(
            workdir,
            WalkerConfig::new(self.config.max_depth, self.config.extensions.clone()),
        );
        let files: Vec<FileEntry> = walker
            .walk()
            .filter_map(|result| match result {
                Ok(file) => {
                    self.notify_item(&file.key);
                    Some(file)
                }
                Err(e) => {
                    log::warn!("{}", e);
                    None
                }
            })
            .collect();
        self.notify_end("walking");
        log::info!("Found {} candidate images", files.len());
        files
    }

    /// Score every file in parallel; results line up with `files`.
    fn score_files(&self, pool: &rayon::ThreadPool, files: &[FileEntry]) -> Vec<Scored> {
        self.notify_start("scoring", files.len());
        let decoder = Arc::clone(&self.decoder);
        let config = &self.config;

        let results = pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    let scored = match decoder.decode(&file.path) {
                        Ok(decoded) => {
                            let assessment = assess(&decoded.pixels, &config.params, config.split_image);
                            Scored::Verdict(classify(&assessment, &config.thresholds))
                        }
                        Err(DecodeError::Unreadable(_)) => Scored::Unreadable,
                        Err(e) => Scored::Failed(e.to_string()),
                    };
                    if let Some(ref callback) = config.progress_callback {
                        callback.on_item_completed(&file.key);
                    }
                    scored
                })
                .collect()
        });

        self.notify_end("scoring");
        results
    }

    fn move_flagged(
        &self,
        workdir: &Path,
        file: &FileEntry,
        dest_dir: &Path,
        cache: Option<&mut HashCache>,
        log: &mut RunLog,
        summary: &mut DetectorSummary,
    ) {
        match relocate(workdir, &file.path, &file.key, dest_dir, cache) {
            Ok(moved) => {
                summary.moved += 1;
                summary.moved_bytes += moved.size;
                log.record(format!("MOVED blurry file: {} -> {}", file.key, moved.new_key));
            }
            Err(e) => {
                summary.move_errors += 1;
                log::warn!("Failed to move {}: {}", file.key, e);
                log.record(format!("ERROR moving {}: {}", file.key, e));
            }
        }
    }

    fn notify_start(&self, phase: &str, total: usize) {
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(phase, total);
        }
    }

    fn notify_item(&self, path: &str) {
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_item_completed(path);
        }
    }

    fn notify_end(&self, phase: &str) {
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(phase);
        }
    }
}
