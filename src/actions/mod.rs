//! File actions module.
//!
//! picsift never deletes images. Flagged files are moved into side folders
//! (`duplicates/`, `blurry/...`) next to the originals, where the user can
//! review them; the walker skips those folders on later runs.
//!
//! ```no_run
//! use picsift::actions::move_file;
//! use std::path::Path;
//!
//! let dest = move_file(Path::new("/photos/a.jpg"), Path::new("/photos/duplicates"))?;
//! println!("Moved to {}", dest.display());
//! # Ok::<(), picsift::actions::RelocateError>(())
//! ```

pub mod relocate;

pub use relocate::{move_file, relocate, unique_destination, RelocateError, Relocation};
