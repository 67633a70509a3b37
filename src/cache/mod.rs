//! Fingerprint cache for picsift.
//!
//! Persists one row per image so that later runs skip decoding files that
//! have not changed.
//!
//! # Architecture
//!
//! * [`database`]: SQLite persistence, schema and row operations.
//! * [`entry`]: Row data models.
//! * [`freshness`]: Decides which discovered files can reuse their row.
//!
//! # Cache Invalidation
//!
//! Rows are keyed by the path relative to the working directory and
//! validated by:
//! * File size
//! * Modification time, within [`freshness::MTIME_TOLERANCE`]
//!
//! Rows are never pruned; entries for deleted files simply go unused.

pub mod database;
pub mod entry;
pub mod freshness;

pub use database::{CacheError, CacheResult, HashCache};
pub use entry::{CachedMeta, ImageRecord};
pub use freshness::{is_fresh, plan_refresh, FreshEntry, RefreshPlan, MTIME_TOLERANCE};
