//! Collision-safe file relocation.
//!
//! Files are moved, never deleted or overwritten. When the destination name
//! is taken, `<stem>_<n><ext>` is tried for `n = 1, 2, ...` until a free
//! name is found. After a move the cache row follows the file so its
//! fingerprint survives.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cache::{CacheError, HashCache};
use crate::scanner::mtime_seconds;
use crate::scanner::path_utils::relative_key;

/// Error type for relocation.
#[derive(Debug, Error)]
pub enum RelocateError {
    /// Source file disappeared before it could be moved.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied on the source or destination.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Source path has no file name component.
    #[error("not a file path: {0}")]
    NoFileName(PathBuf),

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file moved but its cache row could not follow.
    #[error("moved to {path} but cache update failed: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: CacheError,
    },
}

impl RelocateError {
    fn from_io(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }
}

/// A completed move.
#[derive(Debug, Clone, PartialEq)]
pub struct Relocation {
    /// Former absolute path
    pub from: PathBuf,
    /// New absolute path
    pub to: PathBuf,
    /// New cache key relative to the working directory
    pub new_key: String,
    /// Size re-read after the move
    pub size: u64,
    /// Modification time re-read after the move
    pub mtime: f64,
    /// Whether a cache row was carried over
    pub cache_updated: bool,
}

/// First free path for `file_name` inside `dest_dir`.
///
/// # Example
///
/// ```
/// use picsift::actions::unique_destination;
/// use std::path::Path;
///
/// let dir = tempfile::tempdir().unwrap();
/// std::fs::write(dir.path().join("a.jpg"), b"taken").unwrap();
///
/// let dest = unique_destination(dir.path(), Path::new("a.jpg"));
/// assert_eq!(dest, dir.path().join("a_1.jpg"));
/// ```
#[must_use]
pub fn unique_destination(dest_dir: &Path, file_name: &Path) -> PathBuf {
    let first = dest_dir.join(file_name);
    if !first.exists() {
        return first;
    }

    let stem = file_name.file_stem().unwrap_or(file_name.as_os_str());
    let ext = file_name.extension();

    (1u64..)
        .map(|n| {
            let mut name = OsString::from(stem);
            name.push(format!("_{n}"));
            if let Some(ext) = ext {
                name.push(".");
                name.push(ext);
            }
            dest_dir.join(name)
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

/// Move `src` into `dest_dir`, creating the directory if needed.
///
/// Falls back to copy-then-remove when a plain rename is refused, for
/// example across filesystems. Returns the final path.
///
/// # Errors
///
/// Returns a [`RelocateError`] if the directory cannot be created or the
/// file cannot be moved.
pub fn move_file(src: &Path, dest_dir: &Path) -> Result<PathBuf, RelocateError> {
    let file_name = src
        .file_name()
        .ok_or_else(|| RelocateError::NoFileName(src.to_path_buf()))?;

    fs::create_dir_all(dest_dir).map_err(|e| RelocateError::from_io(dest_dir, e))?;
    let dest = unique_destination(dest_dir, Path::new(file_name));

    match fs::rename(src, &dest) {
        Ok(()) => {}
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied) => {
            return Err(RelocateError::from_io(src, e));
        }
        Err(e) => {
            log::debug!(
                "Rename {} -> {} failed ({}), copying instead",
                src.display(),
                dest.display(),
                e
            );
            fs::copy(src, &dest).map_err(|e| RelocateError::from_io(src, e))?;
            if let Err(e) = fs::remove_file(src) {
                let _ = fs::remove_file(&dest);
                return Err(RelocateError::from_io(src, e));
            }
        }
    }

    log::debug!("Moved {} -> {}", src.display(), dest.display());
    Ok(dest)
}

/// Move `src` into `dest_dir` and carry its cache row from `old_key` to the
/// new relative path.
///
/// # Errors
///
/// Returns a [`RelocateError`] if the move fails, or
/// [`RelocateError::Cache`] if the file moved but the row could not follow.
pub fn relocate(
    workdir: &Path,
    src: &Path,
    old_key: &str,
    dest_dir: &Path,
    cache: Option<&mut HashCache>,
) -> Result<Relocation, RelocateError> {
    let to = move_file(src, dest_dir)?;

    let metadata = fs::metadata(&to).map_err(|e| RelocateError::from_io(&to, e))?;
    let size = metadata.len();
    let mtime = mtime_seconds(&metadata);
    let new_key = relative_key(workdir, &to).unwrap_or_else(|| to.to_string_lossy().into_owned());

    let cache_updated = match cache {
        Some(cache) => cache
            .rename(old_key, &new_key, size, mtime)
            .map_err(|source| RelocateError::Cache {
                path: to.clone(),
                source,
            })?,
        None => false,
    };

    Ok(Relocation {
        from: src.to_path_buf(),
        to,
        new_key,
        size,
        mtime,
        cache_updated,
    })
}
