//! Near-duplicate grouping by fingerprint distance.
//!
//! # Overview
//!
//! [`group_duplicates`] clusters `(path, fingerprint)` pairs greedily in input
//! order. Each unassigned entry seeds a group, and every later unassigned
//! entry within `threshold` bits *of the seed* joins it.
//!
//! Membership is decided against the seed only, so the result is not a
//! transitive closure: two members may be further apart from each other than
//! the threshold, and an image close to a non-seed member but far from the
//! seed starts its own group.
//!
//! # Example
//!
//! ```
//! use picsift::duplicates::group_duplicates;
//!
//! let entries = vec![
//!     ("a.jpg".to_string(), Some("0000000000000000".to_string())),
//!     ("b.jpg".to_string(), Some("0000000000000003".to_string())),
//!     ("c.jpg".to_string(), Some("ffffffffffffffff".to_string())),
//!     ("broken.jpg".to_string(), None),
//! ];
//!
//! let groups = group_duplicates(&entries, 6);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].members, vec!["a.jpg", "b.jpg"]);
//! ```

use serde::{Deserialize, Serialize};

use crate::scanner::distance;

/// A set of near-duplicate images, in input order. The first member is the
/// seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Relative paths of the members
    pub members: Vec<String>,
}

impl DuplicateGroup {
    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The member that opened the group.
    #[must_use]
    pub fn seed(&self) -> Option<&str> {
        self.members.first().map(String::as_str)
    }
}

/// Cluster entries by perceptual distance to a seed.
///
/// Entries without a fingerprint are skipped. `threshold` is inclusive and
/// must already lie in `0..=64`. A pair whose distance cannot be computed is
/// treated as not within the threshold.
///
/// Only groups with at least two members are returned. The output is fully
/// determined by the input order. Cost is quadratic in the number of entries.
#[must_use]
pub fn group_duplicates(entries: &[(String, Option<String>)], threshold: u32) -> Vec<DuplicateGroup> {
    let hashed: Vec<(&str, &str)> = entries
        .iter()
        .filter_map(|(path, fp)| fp.as_deref().map(|fp| (path.as_str(), fp)))
        .collect();

    let mut assigned = vec![false; hashed.len()];
    let mut groups = Vec::new();

    for i in 0..hashed.len() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;
        let (seed_path, seed_fp) = hashed[i];
        let mut members = vec![seed_path.to_string()];

        for j in (i + 1)..hashed.len() {
            if assigned[j] {
                continue;
            }
            let (path, fp) = hashed[j];
            match distance(seed_fp, fp) {
                Ok(d) if d <= threshold => {
                    assigned[j] = true;
                    members.push(path.to_string());
                }
                Ok(_) => {}
                Err(e) => {
                    log::debug!("Skipping pair {} / {}: {}", seed_path, path, e);
                }
            }
        }

        if members.len() > 1 {
            groups.push(DuplicateGroup { members });
        }
    }

    groups
}
