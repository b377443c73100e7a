//! Snapshot comparison.

use crate::snapshot::{FileRecord, Snapshot};
use serde::{Deserialize, Serialize};

/// Classified difference between two snapshots.
///
/// Every list is sorted and a path appears in at most one of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Digest differs.
    pub modified: Vec<String>,
    /// Same digest, but size or whole-second mtime differs.
    pub metadata_changed: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len() + self.metadata_changed.len()
    }
}

/// Compare `old` against `new`.
///
/// A content change always wins over a metadata change. Modification times
/// are truncated to whole seconds before comparing, so sub-second drift
/// alone never reports a change.
pub fn diff(old: &Snapshot, new: &Snapshot) -> ChangeSet {
    let mut changes = ChangeSet::default();

    // Both sides iterate in key order, so every list comes out sorted.
    for (path, before) in old {
        match new.get(path) {
            None => changes.removed.push(path.clone()),
            Some(after) if before.digest != after.digest => changes.modified.push(path.clone()),
            Some(after) if metadata_differs(before, after) => {
                changes.metadata_changed.push(path.clone())
            }
            Some(_) => {}
        }
    }
    changes.added = new
        .paths()
        .filter(|p| !old.contains(p))
        .map(str::to_string)
        .collect();

    changes
}

fn metadata_differs(before: &FileRecord, after: &FileRecord) -> bool {
    before.size != after.size || whole_seconds(before.mtime) != whole_seconds(after.mtime)
}

/// Truncate toward zero.
fn whole_seconds(mtime: f64) -> i64 {
    mtime.trunc() as i64
}
