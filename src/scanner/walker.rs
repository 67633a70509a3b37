//! Directory walker implementation using jwalk.
//!
//! # Overview
//!
//! [`Walker`] enumerates candidate images under a working directory:
//!
//! - The root is depth 0; files in directories up to `max_depth` are
//!   yielded and deeper directories are never read.
//! - Directories named like a side-effect folder (`duplicates`, `blurry`)
//!   are removed from their parent's listing, so files already relocated by
//!   an earlier run are never seen again.
//! - Only files whose lowercase extension is configured are yielded.
//! - Children are sorted by name, making the output order deterministic.
//!
//! # Example
//!
//! ```no_run
//! use picsift::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/photos"), WalkerConfig::new(2, vec!["jpg".into()]));
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("Found {} images", files.len());
//! ```

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;

use super::path_utils::relative_key;
use super::{mtime_seconds, FileEntry, ScanError, WalkerConfig};

/// Directory walker for candidate discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
        }
    }

    /// Check if a file has a supported extension.
    fn has_supported_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(OsStr::to_str)
            .map(str::to_lowercase)
            .is_some_and(|ext| self.config.extensions.iter().any(|e| *e == ext))
    }

    /// Walk the directory tree, yielding candidate files.
    ///
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + '_ {
        let excluded: HashSet<String> = self.config.excluded_dirs.iter().cloned().collect();

        // jwalk depth counts entries, so files of a directory at depth d sit
        // at d + 1.
        let walk_dir = WalkDir::new(&self.root)
            .follow_links(false)
            .skip_hidden(false)
            .max_depth(self.config.max_depth.saturating_add(1))
            .process_read_dir(move |_depth, _path, _read_dir_state, children| {
                children.retain(|child| match child {
                    Ok(entry) => {
                        !(entry.file_type().is_dir()
                            && entry
                                .file_name()
                                .to_str()
                                .is_some_and(|name| excluded.contains(name)))
                    }
                    Err(_) => true,
                });
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
            });

        walk_dir
            .into_iter()
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    if file_type.is_dir() {
                        return None;
                    }
                    if file_type.is_symlink() {
                        log::trace!("Skipping symlink: {}", entry.path().display());
                        return None;
                    }

                    let path = entry.path();
                    if !self.has_supported_extension(&path) {
                        log::trace!("Skipping unsupported file: {}", path.display());
                        return None;
                    }

                    Some(self.process_file_entry(path))
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                    log::warn!("Walker error for {}: {}", path.display(), e);
                    Some(Err(ScanError::Io {
                        path,
                        source: std::io::Error::other(e.to_string()),
                    }))
                }
            })
    }

    /// Stat a candidate and build its entry.
    fn process_file_entry(&self, path: PathBuf) -> Result<FileEntry, ScanError> {
        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => return Err(self.handle_io_error(&path, e)),
        };

        let key = relative_key(&self.root, &path).ok_or_else(|| ScanError::NotFound(path.clone()))?;

        Ok(FileEntry {
            key,
            size: metadata.len(),
            mtime: mtime_seconds(&metadata),
            path,
        })
    }

    /// Handle I/O errors during file access.
    fn handle_io_error(&self, path: &Path, error: std::io::Error) -> ScanError {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path.to_path_buf())
            }
            ErrorKind::NotFound => {
                log::debug!("File not found (may have been moved): {}", path.display());
                ScanError::NotFound(path.to_path_buf())
            }
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), error);
                ScanError::Io {
                    path: path.to_path_buf(),
                    source: error,
                }
            }
        }
    }
}
