//! Scan report history.
//!
//! Each scan produces one record
//! `{"root": ..., "generated_at": "<ISO-8601>Z", "changes": {...}}`. Records
//! are kept either as a pretty-printed JSON array or as NDJSON, one compact
//! record per line.

use crate::diff::ChangeSet;
use crate::error::{FimError, Result};
use crate::store::write_atomic;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, warn};

/// One persisted scan result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub root: String,
    pub generated_at: String,
    pub changes: ChangeSet,
}

impl Report {
    /// Stamp `changes` for `root` with the current UTC time.
    pub fn new(root: &Path, changes: ChangeSet) -> Self {
        Self {
            root: root.display().to_string(),
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            changes,
        }
    }
}

/// How a report is written to its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    /// Replace the file with a one-element JSON array.
    JsonOverwrite,
    /// Add to the JSON array already in the file.
    JsonAppend,
    /// Replace the file with a single NDJSON line.
    NdjsonOverwrite,
    /// Add one NDJSON line.
    NdjsonAppend,
}

impl ReportMode {
    pub fn from_flags(append: bool, ndjson: bool) -> Self {
        match (append, ndjson) {
            (false, false) => Self::JsonOverwrite,
            (true, false) => Self::JsonAppend,
            (false, true) => Self::NdjsonOverwrite,
            (true, true) => Self::NdjsonAppend,
        }
    }

    pub fn is_append(&self) -> bool {
        matches!(self, Self::JsonAppend | Self::NdjsonAppend)
    }

    pub fn is_ndjson(&self) -> bool {
        matches!(self, Self::NdjsonOverwrite | Self::NdjsonAppend)
    }

    /// Short label such as `append, ndjson`.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::JsonOverwrite => "overwrite, json",
            Self::JsonAppend => "append, json",
            Self::NdjsonOverwrite => "overwrite, ndjson",
            Self::NdjsonAppend => "append, ndjson",
        }
    }
}

/// Persist `changes` for `root` to `path` and return the record written.
///
/// Missing parent directories are created. Existing records survive every
/// mode except the two overwrite modes. In [`ReportMode::JsonAppend`] an
/// existing file that is not a JSON array is wrapped into one, and a file
/// that cannot be read or parsed is replaced by a fresh array.
pub fn write_report(
    changes: &ChangeSet,
    root: &Path,
    path: &Path,
    mode: ReportMode,
) -> Result<Report> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| FimError::io("create report directory", parent, e))?;
    }

    let report = Report::new(root, changes.clone());
    match mode {
        ReportMode::NdjsonOverwrite | ReportMode::NdjsonAppend => {
            let mut line = serde_json::to_string(&report).map_err(|e| FimError::format(path, e))?;
            line.push('\n');
            let written = if mode.is_append() {
                append_line(path, &line)
            } else {
                write_atomic(path, line.as_bytes())
            };
            written.map_err(|e| FimError::io("write report", path, e))?;
        }
        ReportMode::JsonOverwrite | ReportMode::JsonAppend => {
            let mut records = if mode.is_append() {
                existing_records(path)
            } else {
                Vec::new()
            };
            records.push(serde_json::to_value(&report).map_err(|e| FimError::format(path, e))?);
            let json = serde_json::to_vec_pretty(&records).map_err(|e| FimError::format(path, e))?;
            write_atomic(path, &json).map_err(|e| FimError::io("write report", path, e))?;
        }
    }

    debug!(path = %path.display(), mode = mode.describe(), changes = changes.total(), "report written");
    Ok(report)
}

fn append_line(path: &Path, line: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    file.flush()
}

/// Records already stored at `path`, kept as raw JSON so nothing is lost.
fn existing_records(path: &Path) -> Vec<Value> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read existing report, starting fresh");
            return Vec::new();
        }
    };
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Array(records)) => records,
        Ok(single) => vec![single],
        Err(e) => {
            warn!(path = %path.display(), error = %e, "existing report is not valid JSON, starting fresh");
            Vec::new()
        }
    }
}

/// Read back every record stored at `path`, in either format.
pub fn read_reports(path: &Path) -> Result<Vec<Report>> {
    let text = fs::read_to_string(path).map_err(|e| FimError::io("read report", path, e))?;
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|e| FimError::format(path, e));
    }
    if let Ok(single) = serde_json::from_str::<Report>(trimmed) {
        return Ok(vec![single]);
    }
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(|e| FimError::format(path, e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn changes(added: &[&str]) -> ChangeSet {
        ChangeSet {
            added: added.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn overwrite_writes_single_element_array() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("report.json");
        let root = Path::new("/watched");

        write_report(&changes(&["one"]), root, &out, ReportMode::JsonOverwrite).unwrap();
        write_report(&changes(&["two"]), root, &out, ReportMode::JsonOverwrite).unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        let arr = value.as_array().unwrap();
        assert_eq!(arr.len(), 1);
        assert_eq!(arr[0]["root"], "/watched");
        assert_eq!(arr[0]["changes"]["added"][0], "two");
    }

    #[test]
    fn append_grows_the_array() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("report.json");
        for name in ["a", "b", "c"] {
            write_report(&changes(&[name]), dir.path(), &out, ReportMode::JsonAppend).unwrap();
        }
        let reports = read_reports(&out).unwrap();
        let added: Vec<_> = reports.iter().map(|r| r.changes.added[0].as_str()).collect();
        assert_eq!(added, vec!["a", "b", "c"]);
    }

    #[test]
    fn append_wraps_a_lone_prior_record() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("report.json");
        let prior = Report::new(dir.path(), changes(&["old"]));
        fs::write(&out, serde_json::to_string(&prior).unwrap()).unwrap();

        write_report(&changes(&["new"]), dir.path(), &out, ReportMode::JsonAppend).unwrap();
        let reports = read_reports(&out).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0], prior);
        assert_eq!(reports[1].changes.added, vec!["new"]);
    }

    #[test]
    fn append_replaces_corrupt_file_with_fresh_array() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("report.json");
        fs::write(&out, "{ this is not json").unwrap();

        write_report(&changes(&["x"]), dir.path(), &out, ReportMode::JsonAppend).unwrap();
        let reports = read_reports(&out).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].changes.added, vec!["x"]);
    }

    #[test]
    fn ndjson_append_adds_lines_and_overwrite_truncates() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("log.ndjson");
        write_report(&changes(&["1"]), dir.path(), &out, ReportMode::NdjsonAppend).unwrap();
        write_report(&changes(&["2"]), dir.path(), &out, ReportMode::NdjsonAppend).unwrap();

        let text = fs::read_to_string(&out).unwrap();
        assert_eq!(text.lines().count(), 2);
        for line in text.lines() {
            let v: Value = serde_json::from_str(line).unwrap();
            assert!(v["changes"].is_object());
        }
        assert_eq!(read_reports(&out).unwrap().len(), 2);

        write_report(&changes(&["3"]), dir.path(), &out, ReportMode::NdjsonOverwrite).unwrap();
        let reports = read_reports(&out).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].changes.added, vec!["3"]);
    }

    #[test]
    fn creates_missing_directories() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("reports/2026/scan.json");
        write_report(&ChangeSet::default(), dir.path(), &out, ReportMode::JsonOverwrite).unwrap();
        assert!(out.exists());
    }

    #[test]
    fn generated_at_is_utc_iso8601_with_z() {
        let report = Report::new(Path::new("/r"), ChangeSet::default());
        assert!(report.generated_at.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&report.generated_at).is_ok());
        assert_eq!(report.generated_at.len(), "2026-10-19T08:00:00.123456Z".len());
    }

    #[test]
    fn mode_from_flags() {
        assert_eq!(ReportMode::from_flags(false, false), ReportMode::JsonOverwrite);
        assert_eq!(ReportMode::from_flags(true, false), ReportMode::JsonAppend);
        assert_eq!(ReportMode::from_flags(false, true), ReportMode::NdjsonOverwrite);
        assert_eq!(ReportMode::from_flags(true, true), ReportMode::NdjsonAppend);
        assert_eq!(ReportMode::NdjsonAppend.describe(), "append, ndjson");
    }
}
