//! Duplicate finder: the near-duplicate pipeline.
//!
//! # Overview
//!
//! [`DuplicateFinder::run`] drives one pass over a working directory:
//!
//! 1. **Walk**: enumerate candidate images (see [`crate::scanner::Walker`])
//! 2. **Plan**: split them into fresh and stale against the cache
//!    (see [`crate::cache::plan_refresh`])
//! 3. **Hash**: decode and fingerprint stale files on a rayon pool
//! 4. **Persist**: upsert the new records once every worker has finished
//! 5. **Group**: seed-centric clustering (see [`super::group_duplicates`])
//! 6. **Rank**: keep the member with the highest Laplacian variance
//! 7. **Move**: relocate every other member into a `duplicates/` folder
//!
//! Workers only compute. Cache writes, moves and journal lines all happen on
//! the calling thread after the pool has been drained.
//!
//! # Example
//!
//! ```no_run
//! use picsift::cache::HashCache;
//! use picsift::duplicates::{DuplicateFinder, FinderConfig};
//! use picsift::logging::RunLog;
//! use std::path::Path;
//!
//! let workdir = Path::new("/photos");
//! let mut cache = HashCache::open(&workdir.join(".picsift_cache.db"))?;
//! let mut log = RunLog::open(workdir)?;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default().with_threshold(4));
//! let summary = finder.run(workdir, &mut cache, &mut log)?;
//! println!("{} groups, {} files moved", summary.groups.len(), summary.moved);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::ThreadPool;
use thiserror::Error;

use super::groups::{group_duplicates, DuplicateGroup};
use crate::actions::relocate;
use crate::blur::sharpness::laplacian_variance;
use crate::cache::{plan_refresh, CacheError, HashCache, ImageRecord};
use crate::config::{default_jobs, Settings, DEFAULT_EXTENSIONS, DUPLICATES_DIR_NAME};
use crate::logging::RunLog;
use crate::progress::ProgressCallback;
use crate::scanner::{
    FileEntry, FingerprintEngine, ImageDecoder, ReadMethod, StrategyDecoder, Walker,
    WalkerConfig,
};

/// Errors that abort a duplicate run.
///
/// Per-file problems never surface here; they are journaled and the run
/// continues.
#[derive(Debug, Error)]
pub enum FinderError {
    /// The working directory does not exist or is not a directory.
    #[error("Working directory not found: {0}")]
    NotADirectory(PathBuf),

    /// The cache could not be read or written.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The worker pool could not be created.
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Inclusive Hamming distance threshold, `0..=64`.
    pub threshold: u32,
    /// Worker thread count.
    pub jobs: usize,
    /// Maximum recursion depth (root = 0).
    pub max_depth: usize,
    /// Rehash every file regardless of the cache.
    pub force_rescan: bool,
    /// Candidate extensions, lowercase without the dot.
    pub extensions: Vec<String>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("threshold", &self.threshold)
            .field("jobs", &self.jobs)
            .field("max_depth", &self.max_depth)
            .field("force_rescan", &self.force_rescan)
            .field("extensions", &self.extensions)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            threshold: 6,
            jobs: default_jobs(),
            max_depth: 5,
            force_rescan: false,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Build a configuration from validated settings.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            threshold: settings.hamming_threshold(),
            jobs: settings.jobs,
            max_depth: settings.depth,
            extensions: settings.extensions.clone(),
            ..Default::default()
        }
    }

    /// Set the Hamming distance threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the worker thread count.
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Set the maximum recursion depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Ignore the cache and rehash everything.
    #[must_use]
    pub fn with_force_rescan(mut self, force: bool) -> Self {
        self.force_rescan = force;
        self
    }

    /// Set the candidate extensions.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn walker_config(&self) -> WalkerConfig {
        WalkerConfig::new(self.max_depth, self.extensions.clone())
    }
}

/// Outcome of a duplicate run.
#[derive(Debug, Clone, Default)]
pub struct FinderSummary {
    /// Candidate files found by the walk
    pub total_files: usize,
    /// Files whose cached fingerprint was reused
    pub cache_hits: usize,
    /// Files decoded and fingerprinted this run
    pub hashed: usize,
    /// Files left without a fingerprint this run
    pub unreadable: usize,
    /// Entries the walker could not stat
    pub walk_errors: usize,
    /// Groups found, before any move
    pub groups: Vec<DuplicateGroup>,
    /// Files relocated into `duplicates/`
    pub moved: usize,
    /// Bytes relocated into `duplicates/`
    pub moved_bytes: u64,
    /// Files skipped because an earlier file had the same cache key
    pub key_collisions: usize,
    /// Relocations that failed
    pub move_errors: usize,
    /// Wall time of the run
    pub duration: Duration,
}

/// Near-duplicate detection pipeline.
pub struct DuplicateFinder {
    config: FinderConfig,
    decoder: Arc<dyn ImageDecoder>,
}

impl DuplicateFinder {
    /// Create a finder using the default decode strategies.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
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
    /// # Errors
    ///
    /// Returns a [`FinderError`] if the directory is missing, the cache
    /// fails, or the worker pool cannot be built. Unreadable images and
    /// failed moves are journaled and counted instead.
    pub fn run(
        &self,
        workdir: &Path,
        cache: &mut HashCache,
        log: &mut RunLog,
    ) -> Result<FinderSummary, FinderError> {
        let start = Instant::now();
        let mut summary = FinderSummary::default();

        if !workdir.is_dir() {
            return Err(FinderError::NotADirectory(workdir.to_path_buf()));
        }

        log.record(format!(
            "Starting duplicate scan. threshold={}, jobs={}, recursive_depth={}, force_rescan={}",
            self.config.threshold, self.config.jobs, self.config.max_depth, self.config.force_rescan
        ));

        let (files, collisions) = split_key_collisions(self.walk(workdir, &mut summary));
        for (skipped, kept) in &collisions {
            log::warn!(
                "{} and {} map to the same cache key, skipping the former",
                skipped.display(),
                kept.display()
            );
            log.record(format!(
                "SKIPPED: {} (same key as {})",
                skipped.display(),
                kept.display()
            ));
        }
        summary.key_collisions = collisions.len();
        summary.total_files = files.len();
        let paths: HashMap<String, PathBuf> = files
            .iter()
            .map(|f| (f.key.clone(), f.path.clone()))
            .collect();

        let cached = cache.load()?;
        let plan = plan_refresh(files, &cached, self.config.force_rescan);
        summary.cache_hits = plan.fresh.len();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.jobs)
            .build()?;

        let records = if plan.stale.is_empty() {
            log.record("No files needed hashing (cache up-to-date).");
            Vec::new()
        } else {
            log.record(format!(
                "Hashing {} files (workers={})",
                plan.stale.len(),
                self.config.jobs
            ));
            let records = self.hash_files(&pool, plan.stale);
            cache.upsert(&records)?;
            for record in &records {
                if record.is_readable() {
                    log.record(format!("READ: {} via {}", record.path, record.method));
                } else if record.method == ReadMethod::Fail {
                    log.record(format!("UNREADABLE: {}", record.path));
                } else {
                    log.record(format!(
                        "ERROR processing {}: read via {} but no fingerprint",
                        record.path, record.method
                    ));
                }
            }
            records
        };
        summary.hashed = records.len();
        summary.unreadable = records.iter().filter(|r| !r.is_readable()).count();

        let entries: Vec<(String, Option<String>)> = plan
            .fresh
            .into_iter()
            .map(|f| (f.file.key, f.fingerprint))
            .chain(records.into_iter().map(|r| (r.path, r.fingerprint)))
            .collect();

        if entries.is_empty() {
            log.record("No image entries found after scanning.");
            summary.duration = start.elapsed();
            return Ok(summary);
        }

        log.record(format!(
            "Grouping duplicates with threshold {}",
            self.config.threshold
        ));
        summary.groups = group_duplicates(&entries, self.config.threshold);
        log::info!("Found {} duplicate groups", summary.groups.len());

        let groups = summary.groups.clone();
        let keepers = self.rank_groups(&pool, workdir, &paths, &groups);
        for (group, keeper) in groups.iter().zip(keepers) {
            self.relocate_group(workdir, &paths, group, keeper, cache, log, &mut summary);
        }

        log.record(format!(
            "Scan complete. groups={}, moved={}",
            summary.groups.len(),
            summary.moved
        ));
        summary.duration = start.elapsed();
        Ok(summary)
    }

    fn walk(&self, workdir: &Path, summary: &mut FinderSummary) -> Vec<FileEntry> {
        self.notify_start("walking", 0);
        let walker = Walker::new(workdir, self.config.walker_config());
        let mut files = Vec::new();
        for result in walker.walk() {
            match result {
                Ok(file) => {
                    self.notify_item(&file.key);
                    files.push(file);
                }
                Err(e) => {
                    log::warn!("{}", e);
                    summary.walk_errors += 1;
                }
            }
        }
        self.notify_end("walking");
        log::info!("Found {} candidate images", files.len());
        files
    }

    /// Decode and fingerprint `stale` in parallel, returning records in
    /// dispatch order.
    fn hash_files(&self, pool: &ThreadPool, stale: Vec<FileEntry>) -> Vec<ImageRecord> {
        self.notify_start("hashing", stale.len());
        let decoder = Arc::clone(&self.decoder);
        let progress = self.config.progress_callback.clone();

        let records: Vec<ImageRecord> = pool.install(|| {
            stale
                .into_par_iter()
                .map_init(FingerprintEngine::new, |engine, file| {
                    let record = fingerprint_file(decoder.as_ref(), engine, &file);
                    if let Some(ref callback) = progress {
                        callback.on_item_completed(&file.key);
                    }
                    record
                })
                .collect()
        });

        self.notify_end("hashing");
        records
    }

    /// Keeper index for every group, in group order.
    ///
    /// All decoding finishes before the first file is moved.
    fn rank_groups(
        &self,
        pool: &ThreadPool,
        workdir: &Path,
        paths: &HashMap<String, PathBuf>,
        groups: &[DuplicateGroup],
    ) -> Vec<usize> {
        self.notify_start("ranking", groups.len());
        let decoder = Arc::clone(&self.decoder);
        let progress = self.config.progress_callback.clone();

        let keepers = pool.install(|| {
            groups
                .par_iter()
                .map(|group| {
                    let scores: Vec<f64> = group
                        .members
                        .par_iter()
                        .map(|key| sharpness_of(decoder.as_ref(), &resolve(workdir, paths, key), key))
                        .collect();
                    if let Some(ref callback) = progress {
                        callback.on_item_completed(group.seed().unwrap_or_default());
                    }
                    sharpest(&scores)
                })
                .collect()
        });

        self.notify_end("ranking");
        keepers
    }

    #[allow(clippy::too_many_arguments)]
    fn relocate_group(
        &self,
        workdir: &Path,
        paths: &HashMap<String, PathBuf>,
        group: &DuplicateGroup,
        keeper: usize,
        cache: &mut HashCache,
        log: &mut RunLog,
        summary: &mut FinderSummary,
    ) {
        let kept = &group.members[keeper];
        for (i, key) in group.members.iter().enumerate() {
            if i == keeper {
                continue;
            }

            let src = resolve(workdir, paths, key);
            let dest_dir = self.duplicates_dir(workdir, &src);
            match relocate(workdir, &src, key, &dest_dir, Some(&mut *cache)) {
                Ok(moved) => {
                    summary.moved += 1;
                    summary.moved_bytes += moved.size;
                    log.record(format!("MOVED: {} -> {} (kept: {})", key, moved.new_key, kept));
                }
                Err(e) => {
                    summary.move_errors += 1;
                    log::warn!("Failed to move {}: {}", key, e);
                    log.record(format!("ERROR moving {}: {}", key, e));
                }
            }
        }
    }

    /// Folder receiving the duplicate at `src`.
    fn duplicates_dir(&self, workdir: &Path, src: &Path) -> PathBuf {
        if self.config.max_depth > 0 {
            src.parent()
                .unwrap_or(workdir)
                .join(DUPLICATES_DIR_NAME)
        } else {
            workdir.join(DUPLICATES_DIR_NAME)
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

/// Worker body: never fails, an unreadable file becomes a `fail` record.
fn fingerprint_file(
    decoder: &dyn ImageDecoder,
    engine: &FingerprintEngine,
    file: &FileEntry,
) -> ImageRecord {
    let decoded = match decoder.decode(&file.path) {
        Ok(decoded) => decoded,
        Err(e) => {
            log::debug!("Decode failed for {}: {}", file.key, e);
            return ImageRecord::unreadable(file);
        }
    };

    match engine.fingerprint(&decoded.pixels) {
        Ok(hex) => ImageRecord::hashed(file, hex, decoded.method),
        Err(e) => {
            log::debug!("Fingerprint failed for {}: {}", file.key, e);
            ImageRecord::unhashed(file, decoded.method)
        }
    }
}

/// Full-image Laplacian variance, or zero when the file cannot be decoded.
fn sharpness_of(decoder: &dyn ImageDecoder, path: &Path, key: &str) -> f64 {
    match decoder.decode(path) {
        Ok(decoded) => laplacian_variance(&image::imageops::grayscale(&decoded.pixels)),
        Err(e) => {
            log::debug!("Keeper scoring failed for {}: {}", key, e);
            0.0
        }
    }
}

/// Index of the highest score; ties keep the earlier index.
fn sharpest(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, score) in scores.iter().enumerate() {
        if *score > scores[best] {
            best = i;
        }
    }
    best
}

/// Keep the first file seen for each cache key.
///
/// Names that differ only in Unicode normalization share a key. Returns the
/// kept files and, for each dropped one, its path and the path that won.
fn split_key_collisions(files: Vec<FileEntry>) -> (Vec<FileEntry>, Vec<(PathBuf, PathBuf)>) {
    let mut seen: HashMap<String, PathBuf> = HashMap::with_capacity(files.len());
    let mut kept = Vec::with_capacity(files.len());
    let mut collisions = Vec::new();
    for file in files {
        if let Some(first) = seen.get(&file.key) {
            collisions.push((file.path, first.clone()));
        } else {
            seen.insert(file.key.clone(), file.path.clone());
            kept.push(file);
        }
    }
    (kept, collisions)
}

/// On-disk path for a cache key, preferring the path seen by the walk.
fn resolve(workdir: &Path, paths: &HashMap<String, PathBuf>, key: &str) -> PathBuf {
    paths.get(key).cloned().unwrap_or_else(|| workdir.join(key))
}
