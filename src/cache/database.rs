//! SQLite-backed fingerprint cache.
//!
//! One database per working directory, in WAL mode so external readers can
//! inspect it during a run. Only the orchestrating thread writes, and only
//! after worker results have been collected.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use super::entry::{CachedMeta, ImageRecord};
use crate::scanner::ReadMethod;

/// Errors raised by the cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Underlying SQLite failure.
    #[error("Cache database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A size does not fit SQLite's signed integer column.
    #[error("File size {0} exceeds the cache's integer range")]
    SizeOverflow(u64),
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS images (
        filepath TEXT PRIMARY KEY,
        hash TEXT,
        read_method TEXT,
        size INTEGER,
        mtime REAL
    );
";

/// Persistent cache mapping relative path to fingerprint and file state.
pub struct HashCache {
    conn: Connection,
}

impl std::fmt::Debug for HashCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashCache")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl HashCache {
    /// Opens or creates a cache database at the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema cannot be
    /// created.
    pub fn open(path: &Path) -> CacheResult<Self> {
        let conn = Connection::open(path)?;
        // journal_mode reports the resulting mode as a row.
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("Cache {} opened in {} mode", path.display(), mode);
        Self::init(conn)
    }

    /// Opens a private in-memory cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> CacheResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> CacheResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Bulk read of every row, keyed by relative path.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn load(&self) -> CacheResult<HashMap<String, CachedMeta>> {
        let mut stmt = self
            .conn
            .prepare("SELECT filepath, size, mtime, hash FROM images")?;
        let rows = stmt.query_map([], |row| {
            let size: i64 = row.get(1)?;
            Ok((
                row.get::<_, String>(0)?,
                CachedMeta {
                    size: u64::try_from(size).unwrap_or(0),
                    mtime: row.get(2)?,
                    fingerprint: row.get(3)?,
                },
            ))
        })?;

        let mut map = HashMap::new();
        for row in rows {
            let (path, meta) = row?;
            map.insert(path, meta);
        }
        Ok(map)
    }

    /// Insert or overwrite `records` in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; nothing is committed then.
    pub fn upsert(&mut self, records: &[ImageRecord]) -> CacheResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO images (filepath, hash, read_method, size, mtime)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.path,
                    record.fingerprint,
                    record.method.as_str(),
                    to_sql_size(record.size)?,
                    record.mtime,
                ])?;
            }
        }
        tx.commit()?;

        log::debug!("Cache upserted {} records", records.len());
        Ok(())
    }

    /// Move the row for `old_path` to `new_path`, keeping its fingerprint.
    ///
    /// A leftover row already stored under `new_path` (a file deleted since
    /// it was cached) is replaced. Returns whether a row was moved.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails; nothing is committed then.
    pub fn rename(
        &mut self,
        old_path: &str,
        new_path: &str,
        new_size: u64,
        new_mtime: f64,
    ) -> CacheResult<bool> {
        let tx = self.conn.transaction()?;
        if old_path != new_path {
            tx.execute("DELETE FROM images WHERE filepath = ?1", params![new_path])?;
        }
        let updated = tx.execute(
            "UPDATE images SET filepath = ?1, size = ?2, mtime = ?3 WHERE filepath = ?4",
            params![new_path, to_sql_size(new_size)?, new_mtime, old_path],
        )?;
        tx.commit()?;
        Ok(updated > 0)
    }

    /// Fetch a single row.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get(&self, path: &str) -> CacheResult<Option<ImageRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT filepath, hash, read_method, size, mtime FROM images WHERE filepath = ?1",
                params![path],
                |row| {
                    let method: Option<String> = row.get(2)?;
                    let size: i64 = row.get(3)?;
                    Ok(ImageRecord {
                        path: row.get(0)?,
                        fingerprint: row.get(1)?,
                        method: method
                            .and_then(|m| m.parse().ok())
                            .unwrap_or(ReadMethod::Fail),
                        size: u64::try_from(size).unwrap_or(0),
                        mtime: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Number of rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn len(&self) -> CacheResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Whether the cache holds no rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }
}

fn to_sql_size(size: u64) -> CacheResult<i64> {
    i64::try_from(size).map_err(|_| CacheError::SizeOverflow(size))
}
