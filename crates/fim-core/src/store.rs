//! Baseline persistence.
//!
//! A baseline is the JSON document
//! `{"created_utc": <float>, "schema": 1, "files": {<relpath>: {"sha256", "size", "mtime"}}}`.
//! Saves always replace the whole file through a temp file in the same
//! directory, so readers see either the old or the new baseline.

use crate::error::{FimError, Result};
use crate::snapshot::Snapshot;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Baseline file name used when no explicit location is given.
pub const DEFAULT_BASELINE_NAME: &str = ".fim_baseline.json";

/// Current baseline schema.
pub const SCHEMA_VERSION: u32 = 1;

/// Persisted wrapper around one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    /// Creation time, float seconds since the Unix epoch.
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default = "default_schema")]
    pub schema: u32,
    pub files: Snapshot,
}

fn default_schema() -> u32 {
    SCHEMA_VERSION
}

impl Baseline {
    /// Wrap `files` with the current time and schema.
    pub fn new(files: Snapshot) -> Self {
        Self {
            created_utc: now_epoch_secs(),
            schema: SCHEMA_VERSION,
            files,
        }
    }
}

fn now_epoch_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Write `snapshot` as the baseline at `path`, replacing any previous one.
pub fn save_baseline(snapshot: &Snapshot, path: &Path) -> Result<()> {
    let baseline = Baseline::new(snapshot.clone());
    let json = serde_json::to_vec_pretty(&baseline).map_err(|e| FimError::format(path, e))?;
    write_atomic(path, &json).map_err(|e| FimError::io("write baseline", path, e))?;
    debug!(path = %path.display(), files = snapshot.len(), "baseline saved");
    Ok(())
}

/// Read the snapshot embedded in the baseline at `path`.
pub fn load_baseline(path: &Path) -> Result<Snapshot> {
    load_baseline_document(path).map(|b| b.files)
}

/// Read the whole baseline wrapper at `path`.
///
/// A schema other than [`SCHEMA_VERSION`] is kept as-is and logged.
pub fn load_baseline_document(path: &Path) -> Result<Baseline> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(FimError::BaselineNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(FimError::io("read baseline", path, e)),
    };
    let baseline: Baseline = serde_json::from_str(&text).map_err(|e| FimError::format(path, e))?;
    if baseline.schema != SCHEMA_VERSION {
        warn!(
            path = %path.display(),
            schema = baseline.schema,
            expected = SCHEMA_VERSION,
            "baseline uses an unknown schema version"
        );
    }
    debug!(path = %path.display(), files = baseline.files.len(), "baseline loaded");
    Ok(baseline)
}

/// Replace `path` with `bytes` via a synced temp file in the same directory.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::FileRecord;
    use tempfile::tempdir;

    fn sample() -> Snapshot {
        let mut s = Snapshot::new();
        s.insert(
            "a.txt",
            FileRecord {
                digest: "d1".repeat(32),
                size: 10,
                mtime: 1000.25,
            },
        );
        s.insert(
            "dir/b.bin",
            FileRecord {
                digest: "ab".repeat(32),
                size: 0,
                mtime: 1_729_328_400.123_456_7,
            },
        );
        s
    }

    #[test]
    fn test_baseline_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_BASELINE_NAME);
        let snap = sample();

        save_baseline(&snap, &path).unwrap();
        assert_eq!(load_baseline(&path).unwrap(), snap);

        let doc = load_baseline_document(&path).unwrap();
        assert_eq!(doc.schema, SCHEMA_VERSION);
        assert!(doc.created_utc > 0.0);
    }

    #[test]
    fn written_document_has_expected_shape() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        save_baseline(&sample(), &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["schema"], 1);
        assert!(value["created_utc"].is_f64());
        let a = &value["files"]["a.txt"];
        assert_eq!(a["sha256"], "d1".repeat(32));
        assert_eq!(a["size"], 10);
        assert_eq!(a["mtime"], 1000.25);
    }

    #[test]
    fn save_overwrites_and_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        save_baseline(&sample(), &path).unwrap();
        save_baseline(&Snapshot::new(), &path).unwrap();

        assert!(load_baseline(&path).unwrap().is_empty());
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("baseline.json")]);
    }

    #[test]
    fn missing_baseline_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("none.json");
        assert!(matches!(
            load_baseline(&path),
            Err(FimError::BaselineNotFound(p)) if p == path
        ));
    }

    #[test]
    fn malformed_baselines_are_format_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        for body in ["not json", "[]", r#"{"schema": 1, "created_utc": 1.0}"#, r#"{"files": 3}"#] {
            fs::write(&path, body).unwrap();
            let err = load_baseline(&path).unwrap_err();
            assert!(matches!(err, FimError::Format { .. }), "body {body:?} gave {err:?}");
        }
    }

    #[test]
    fn unknown_schema_is_preserved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("future.json");
        fs::write(&path, r#"{"created_utc": 5.5, "schema": 7, "files": {}}"#).unwrap();
        let doc = load_baseline_document(&path).unwrap();
        assert_eq!(doc.schema, 7);
        assert_eq!(doc.created_utc, 5.5);
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no/such/dir/baseline.json");
        let err = save_baseline(&sample(), &path).unwrap_err();
        assert!(matches!(err, FimError::Io { op: "write baseline", .. }));
    }
}
