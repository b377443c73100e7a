use crate::store::DEFAULT_BASELINE_NAME;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const APP_QUALIFIER: &str = "org";
pub const APP_ORG: &str = "fim";
pub const APP_NAME: &str = "fim";

/// Environment variable overriding the settings file location.
pub const CONFIG_ENV: &str = "FIM_CONFIG";

/// Location of `settings.json`, or `None` if no home directory can be found
/// and `FIM_CONFIG` is unset.
pub fn settings_path() -> Option<PathBuf> {
    if let Some(override_path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(override_path));
    }
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join("settings.json"))
}

/// Where the baseline for `root` lives: `override_path` if given, else
/// `root/.fim_baseline.json`.
pub fn baseline_path(root: &Path, override_path: Option<&Path>) -> PathBuf {
    match override_path {
        Some(p) => p.to_path_buf(),
        None => root.join(DEFAULT_BASELINE_NAME),
    }
}
