//! Cache key derivation for discovered files.
//!
//! A key is the path relative to the working directory, joined with `/` and
//! normalized to Unicode NFC. macOS reports NFD names while Linux and Windows
//! usually report NFC; without normalization the same photo would get two
//! cache rows depending on where the scan ran.
//!
//! Keys identify rows only. File operations always use the on-disk path kept
//! alongside the key in [`FileEntry`](super::FileEntry).
//!
//! # Example
//!
//! ```
//! use picsift::scanner::path_utils::relative_key;
//! use std::path::Path;
//!
//! let key = relative_key(Path::new("/photos"), Path::new("/photos/trip/cafe\u{0301}.jpg"));
//! assert_eq!(key.as_deref(), Some("trip/café.jpg"));
//! ```

use std::path::{Component, Path};
use unicode_normalization::UnicodeNormalization;

/// Normalize a path string to NFC (Composed) form.
#[must_use]
pub fn normalize_path_str(s: &str) -> String {
    s.nfc().collect()
}

/// Key for `path` relative to `root`.
///
/// Returns `None` when `path` is not under `root`.
#[must_use]
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        return None;
    }

    Some(normalize_path_str(&parts.join("/")))
}
