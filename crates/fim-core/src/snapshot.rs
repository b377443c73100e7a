//! Directory snapshots.
//!
//! The builder walks a root without following symlinks, skips anything that
//! is not a regular file (a symlink counts when its target is a regular
//! file), drops excluded paths, and records digest, size and mtime for the
//! rest. Files that cannot be opened for permission reasons, or that vanish
//! between listing and hashing, are left out of the snapshot instead of
//! failing the scan.

use crate::digest::sha256_file;
use crate::error::{FimError, Result};
use crate::filter::PatternSet;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::fs;
use std::io;
use std::path::{Component, Path};
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// One tracked file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// SHA-256 of the content, lowercase hex.
    #[serde(rename = "sha256")]
    pub digest: String,
    pub size: u64,
    /// Seconds since the Unix epoch, with sub-second precision.
    pub mtime: f64,
}

/// Relative path (slash separated) to file record.
///
/// Backed by a `BTreeMap` so serialized baselines list paths in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    files: BTreeMap<String, FileRecord>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, relpath: &str) -> Option<&FileRecord> {
        self.files.get(relpath)
    }

    pub fn contains(&self, relpath: &str) -> bool {
        self.files.contains_key(relpath)
    }

    pub fn insert(&mut self, relpath: impl Into<String>, record: FileRecord) -> Option<FileRecord> {
        self.files.insert(relpath.into(), record)
    }

    pub fn remove(&mut self, relpath: &str) -> Option<FileRecord> {
        self.files.remove(relpath)
    }

    /// Paths in lexicographic order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FileRecord> {
        self.files.iter()
    }
}

impl FromIterator<(String, FileRecord)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, FileRecord)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = (&'a String, &'a FileRecord);
    type IntoIter = btree_map::Iter<'a, String, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

/// Why a regular file was left out of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    PermissionDenied,
    /// Listed by the walk but gone by the time it was opened.
    Vanished,
}

impl SkipReason {
    /// Classify an I/O error as a per-file skip, or `None` if it is fatal.
    pub fn from_io(err: &io::Error) -> Option<Self> {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Some(SkipReason::PermissionDenied),
            io::ErrorKind::NotFound => Some(SkipReason::Vanished),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::Vanished => "vanished",
        }
    }
}

/// Per-file result of a visit.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Recorded(FileRecord),
    Skipped(SkipReason),
}

/// Counters collected during one walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub recorded: u64,
    pub excluded: u64,
    pub not_regular: u64,
    pub permission_denied: u64,
    pub vanished: u64,
    /// Directory entries the walker could not read.
    pub walk_errors: u64,
}

impl ScanStats {
    fn count_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::PermissionDenied => self.permission_denied += 1,
            SkipReason::Vanished => self.vanished += 1,
        }
    }
}

/// Walks one root with one pattern set.
pub struct SnapshotBuilder<'a> {
    root: &'a Path,
    patterns: &'a PatternSet,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(root: &'a Path, patterns: &'a PatternSet) -> Self {
        Self { root, patterns }
    }

    /// Walk the root and return the snapshot together with walk counters.
    pub fn build(&self) -> Result<(Snapshot, ScanStats)> {
        if !self.root.exists() {
            return Err(FimError::RootNotFound(self.root.to_path_buf()));
        }

        let mut snapshot = Snapshot::new();
        let mut stats = ScanStats::default();

        for entry in WalkDir::new(self.root).min_depth(1).follow_links(false) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable entry");
                    stats.walk_errors += 1;
                    continue;
                }
            };

            let path = entry.path();
            if !is_regular_file(path, entry.file_type()) {
                stats.not_regular += 1;
                continue;
            }

            let Some(rel) = relative_slash_path(path, self.root) else {
                stats.not_regular += 1;
                continue;
            };

            if self.patterns.matches(&rel) {
                stats.excluded += 1;
                continue;
            }

            match visit_file(path)? {
                FileOutcome::Recorded(record) => {
                    stats.recorded += 1;
                    snapshot.insert(rel, record);
                }
                FileOutcome::Skipped(reason) => {
                    debug!(path = %rel, reason = reason.as_str(), "file skipped");
                    stats.count_skip(reason);
                }
            }
        }

        if stats.walk_errors > 0 {
            warn!(
                root = %self.root.display(),
                count = stats.walk_errors,
                "some directory entries could not be read"
            );
        }
        info!(
            root = %self.root.display(),
            files = stats.recorded,
            excluded = stats.excluded,
            skipped = stats.permission_denied + stats.vanished,
            "snapshot built"
        );

        Ok((snapshot, stats))
    }
}

/// Walk `root` and return a snapshot of every tracked regular file.
pub fn build_snapshot(root: &Path, patterns: &PatternSet) -> Result<Snapshot> {
    SnapshotBuilder::new(root, patterns)
        .build()
        .map(|(snapshot, _)| snapshot)
}

/// Stat and hash one file.
///
/// Permission and not-found errors become a skip; any other I/O error is
/// returned as fatal.
pub fn visit_file(path: &Path) -> Result<FileOutcome> {
    match record_file(path) {
        Ok(record) => Ok(FileOutcome::Recorded(record)),
        Err(e) => match SkipReason::from_io(&e) {
            Some(reason) => Ok(FileOutcome::Skipped(reason)),
            None => Err(FimError::io("hash file", path, e)),
        },
    }
}

fn record_file(path: &Path) -> io::Result<FileRecord> {
    let metadata = fs::metadata(path)?;
    let digest = sha256_file(path)?;
    Ok(FileRecord {
        digest,
        size: metadata.len(),
        mtime: mtime_secs(&metadata),
    })
}

fn is_regular_file(path: &Path, file_type: fs::FileType) -> bool {
    if file_type.is_file() {
        return true;
    }
    file_type.is_symlink() && fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// Modification time as float seconds since the epoch; negative before 1970.
pub fn mtime_secs(metadata: &fs::Metadata) -> f64 {
    match metadata.modified() {
        Ok(t) => match t.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs_f64(),
            Err(e) => -e.duration().as_secs_f64(),
        },
        Err(_) => 0.0,
    }
}

/// `path` relative to `root`, joined with `/` regardless of platform.
pub fn relative_slash_path(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
