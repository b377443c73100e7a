use anyhow::{anyhow, Context, Result};
use fim_core::paths::baseline_path;
use fim_core::snapshot::relative_slash_path;
use fim_core::{
    build_snapshot, load_baseline, load_ignore_patterns, save_baseline, FimError, PatternSet,
    ReportMode, Snapshot,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::schedule::{run_cycles, spawn_ctrl_c, CycleConfig, Outcome, Schedule};

/// Resolved root, baseline location and exclusion patterns for one invocation.
#[derive(Debug, Clone)]
pub struct Target {
    pub root: PathBuf,
    pub baseline: PathBuf,
    pub patterns: PatternSet,
}

impl Target {
    /// Canonicalize `root` (which must exist) and build its pattern set.
    ///
    /// A baseline or report file that lives under the root is excluded by
    /// name so it never shows up as a change.
    pub fn resolve(
        root: &Path,
        ignore_csv: Option<&str>,
        baseline_override: Option<&Path>,
        extra_ignores: &[String],
        report: Option<&Path>,
    ) -> Result<Self> {
        let root = std::fs::canonicalize(root)
            .map_err(|_| FimError::RootNotFound(root.to_path_buf()))?;
        if !root.is_dir() {
            return Err(anyhow!("root is not a directory: {}", root.display()));
        }
        let baseline = baseline_path(&root, baseline_override);

        let mut patterns = load_ignore_patterns(&root, ignore_csv);
        patterns.extend(extra_ignores);
        for own_file in [Some(baseline.as_path()), report].into_iter().flatten() {
            exclude_if_under_root(&mut patterns, &root, own_file)?;
        }

        Ok(Self {
            root,
            baseline,
            patterns,
        })
    }

    fn snapshot(&self) -> Result<Snapshot> {
        build_snapshot(&self.root, &self.patterns)
            .with_context(|| format!("scanning {}", self.root.display()))
    }

    fn load_baseline(&self) -> Result<Snapshot> {
        match load_baseline(&self.baseline) {
            Err(FimError::BaselineNotFound(path)) => Err(anyhow!(
                "baseline not found: {}. Run 'fim {} init' first.",
                path.display(),
                self.root.display()
            )),
            other => Ok(other?),
        }
    }

    fn save_baseline(&self, snapshot: &Snapshot) -> Result<()> {
        save_baseline(snapshot, &self.baseline)?;
        info!(path = %self.baseline.display(), files = snapshot.len(), "baseline written");
        Ok(())
    }
}

/// Exclude `file` by its exact root-relative path when it lives under `root`.
fn exclude_if_under_root(patterns: &mut PatternSet, root: &Path, file: &Path) -> Result<()> {
    let absolute = if file.is_absolute() {
        file.to_path_buf()
    } else {
        std::env::current_dir()?.join(file)
    };
    let (Some(parent), Some(name)) = (absolute.parent(), absolute.file_name()) else {
        return Ok(());
    };
    // The parent may not exist yet (reports create their directory on write).
    let parent = std::fs::canonicalize(parent).unwrap_or_else(|_| parent.to_path_buf());
    if let Some(rel) = relative_slash_path(&parent.join(name), root) {
        patterns.exclude_path(&rel);
    }
    Ok(())
}

/// Where and how reports are written.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub path: PathBuf,
    pub mode: ReportMode,
}

impl OutputOptions {
    pub fn new(path: PathBuf, append: bool, ndjson: bool) -> Self {
        Self {
            path,
            mode: ReportMode::from_flags(append, ndjson),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub interval_secs: u64,
    pub max_runs: u32,
    pub accept_baseline: bool,
}

pub fn init(target: &Target) -> Result<()> {
    let snapshot = target.snapshot()?;
    target.save_baseline(&snapshot)?;
    println!(
        "Baseline created -> {}  (files tracked: {})",
        target.baseline.display(),
        snapshot.len()
    );
    Ok(())
}

pub fn accept(target: &Target) -> Result<()> {
    let snapshot = target.snapshot()?;
    target.save_baseline(&snapshot)?;
    println!(
        "Baseline updated -> {}  (files tracked: {})",
        target.baseline.display(),
        snapshot.len()
    );
    Ok(())
}

pub async fn scan(target: Target, output: OutputOptions, opts: ScanOptions) -> Result<()> {
    let previous = target.load_baseline()?;
    let baseline = target.baseline.clone();
    let config = Arc::new(CycleConfig {
        root: target.root.clone(),
        patterns: target.patterns.clone(),
        output,
        total_runs: Some(opts.max_runs),
    });
    let schedule = Schedule {
        interval: Duration::from_secs(opts.interval_secs),
        max_runs: Some(opts.max_runs),
    };

    match run_cycles(config, previous, schedule, spawn_ctrl_c()).await? {
        Outcome::Completed(latest) => {
            if opts.accept_baseline {
                target.save_baseline(&latest)?;
                println!("\nBaseline updated -> {}", baseline.display());
            }
        }
        Outcome::Cancelled => {
            println!("\nStopping scan.");
            if opts.accept_baseline {
                info!("scan cancelled, baseline left unchanged");
            }
        }
    }
    Ok(())
}

pub async fn monitor(target: Target, output: OutputOptions, interval_secs: u64) -> Result<()> {
    let previous = target.load_baseline()?;
    println!(
        "Monitoring {} every {}s. Press Ctrl+C to stop.",
        target.root.display(),
        interval_secs
    );
    let config = Arc::new(CycleConfig {
        root: target.root,
        patterns: target.patterns,
        output,
        total_runs: None,
    });
    let schedule = Schedule {
        interval: Duration::from_secs(interval_secs),
        max_runs: None,
    };

    run_cycles(config, previous, schedule, spawn_ctrl_c()).await?;
    println!("\nStopping monitor.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn resolve_rejects_missing_root() {
        let dir = tempdir().unwrap();
        let err = Target::resolve(&dir.path().join("missing"), None, None, &[], None).unwrap_err();
        assert!(err.to_string().contains("root folder does not exist"));
    }

    #[test]
    fn custom_baseline_and_report_under_root_are_excluded() {
        let dir = tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        let target = Target::resolve(
            &root,
            Some("*.log"),
            Some(&root.join("trusted.json")),
            &["*.swp".to_string()],
            Some(&root.join("out/report.json")),
        )
        .unwrap_or_else(|e| panic!("{e:#}"));

        assert!(target.patterns.matches("out/report.json"));
        assert!(target.patterns.matches("trusted.json"));
        assert!(target.patterns.matches("x.log"));
        assert!(target.patterns.matches("a/.b.swp"));
        assert!(target.patterns.matches(".fim_baseline.json"));
        assert_eq!(target.baseline, root.join("trusted.json"));
    }

    #[test]
    fn report_exclusion_keeps_same_named_files_elsewhere() {
        let dir = tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        let target = Target::resolve(&root, None, None, &[], Some(&root.join("out/config.json")))
            .unwrap();

        assert!(target.patterns.matches("out/config.json"));
        assert!(!target.patterns.matches("src/config.json"));
        assert!(!target.patterns.matches("config.json"));
    }

    #[test]
    fn report_outside_root_is_not_excluded() {
        let dir = tempdir().unwrap();
        let elsewhere = tempdir().unwrap();
        let target = Target::resolve(
            dir.path(),
            None,
            None,
            &[],
            Some(&elsewhere.path().join("fim_report.json")),
        )
        .unwrap();
        assert!(!target.patterns.matches("fim_report.json"));
    }
}
