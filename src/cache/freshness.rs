//! Freshness planning: which files can reuse their cached fingerprint.

use std::collections::HashMap;

use super::entry::CachedMeta;
use crate::scanner::FileEntry;

/// Largest mtime difference, in seconds, still treated as unchanged.
pub const MTIME_TOLERANCE: f64 = 1e-6;

/// A file whose cached row still describes it.
#[derive(Debug, Clone, PartialEq)]
pub struct FreshEntry {
    pub file: FileEntry,
    /// Cached fingerprint, `None` if the file was unreadable last time
    pub fingerprint: Option<String>,
}

/// Partition of a walk into reusable and to-be-hashed files.
///
/// Both lists keep the walk order.
#[derive(Debug, Default)]
pub struct RefreshPlan {
    pub fresh: Vec<FreshEntry>,
    pub stale: Vec<FileEntry>,
}

impl RefreshPlan {
    /// Total number of files planned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fresh.len() + self.stale.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fresh.is_empty() && self.stale.is_empty()
    }
}

/// Whether `cached` still describes a file of `size` bytes modified at `mtime`.
#[must_use]
pub fn is_fresh(cached: &CachedMeta, size: u64, mtime: f64) -> bool {
    cached.size == size && (cached.mtime - mtime).abs() <= MTIME_TOLERANCE
}

/// Split `files` into fresh and stale sets against the `cached` rows.
///
/// A file is stale when its key is unknown, its size or mtime changed, or
/// `force` is set. Unreadable files cached as such stay fresh until they
/// change.
#[must_use]
pub fn plan_refresh(
    files: Vec<FileEntry>,
    cached: &HashMap<String, CachedMeta>,
    force: bool,
) -> RefreshPlan {
    let mut plan = RefreshPlan::default();

    for file in files {
        match cached.get(&file.key) {
            Some(meta) if !force && is_fresh(meta, file.size, file.mtime) => {
                plan.fresh.push(FreshEntry {
                    fingerprint: meta.fingerprint.clone(),
                    file,
                });
            }
            _ => plan.stale.push(file),
        }
    }

    log::debug!(
        "Refresh plan: {} fresh, {} stale (force={})",
        plan.fresh.len(),
        plan.stale.len(),
        force
    );
    plan
}
