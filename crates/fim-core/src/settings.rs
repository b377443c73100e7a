use crate::error::{FimError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    #[serde(default = "default_report_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub append: bool,
    #[serde(default)]
    pub ndjson: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSettings {
    #[serde(default)]
    pub interval_secs: u64,
    #[serde(default = "default_max_runs")]
    pub max_runs: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSettings {
    #[serde(default = "default_monitor_interval")]
    pub interval_secs: u64,
}

/// User defaults for the `fim` driver. Command-line flags take precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FimSettings {
    #[serde(default)]
    pub report: ReportSettings,
    #[serde(default)]
    pub scan: ScanSettings,
    #[serde(default)]
    pub monitor: MonitorSettings,
    /// Extra glob patterns excluded under every root.
    #[serde(default)]
    pub ignore: Vec<String>,
}

fn default_report_path() -> PathBuf {
    PathBuf::from("fim_report.json")
}
fn default_max_runs() -> u32 {
    1
}
fn default_monitor_interval() -> u64 {
    15
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            path: default_report_path(),
            append: false,
            ndjson: false,
        }
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            interval_secs: 0,
            max_runs: default_max_runs(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_monitor_interval(),
        }
    }
}

impl Default for FimSettings {
    fn default() -> Self {
        Self {
            report: ReportSettings::default(),
            scan: ScanSettings::default(),
            monitor: MonitorSettings::default(),
            ignore: vec![],
        }
    }
}

/// Load settings from `path`; a missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<FimSettings> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| FimError::format(path, e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(FimSettings::default()),
        Err(e) => Err(FimError::io("read settings", path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let s = load_settings(&dir.path().join("settings.json")).unwrap();
        assert_eq!(s, FimSettings::default());
        assert_eq!(s.monitor.interval_secs, 15);
        assert_eq!(s.scan.max_runs, 1);
        assert_eq!(s.report.path, PathBuf::from("fim_report.json"));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"report": {"ndjson": true}, "ignore": ["*.swp"]}"#).unwrap();

        let s = load_settings(&path).unwrap();
        assert!(s.report.ndjson);
        assert!(!s.report.append);
        assert_eq!(s.report.path, PathBuf::from("fim_report.json"));
        assert_eq!(s.ignore, vec!["*.swp"]);
        assert_eq!(s.monitor, MonitorSettings::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{\"scan\": {\"max_runs\": \"many\"}}").unwrap();
        assert!(matches!(load_settings(&path), Err(FimError::Format { .. })));
    }
}
