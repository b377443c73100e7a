//! Repeated scan cycles with cooperative cancellation.
//!
//! Each cycle builds a fresh snapshot, diffs it against the snapshot from the
//! previous cycle, prints the summary and writes the report. The new snapshot
//! is handed to the next cycle explicitly. A cycle runs on a blocking thread
//! and always finishes; the shutdown flag is only consulted between cycles
//! and while sleeping.

use anyhow::{Context, Result};
use fim_core::{build_snapshot, diff, write_report, PatternSet, Snapshot};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::commands::OutputOptions;
use crate::output::{print_saved, print_summary};

/// Everything a single cycle needs, shared across cycles.
#[derive(Debug)]
pub struct CycleConfig {
    pub root: PathBuf,
    pub patterns: PatternSet,
    pub output: OutputOptions,
    /// Print a `Run i/N:` header when set.
    pub total_runs: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub interval: Duration,
    /// `None` runs until cancelled.
    pub max_runs: Option<u32>,
}

/// How the cycle loop ended.
#[derive(Debug)]
pub enum Outcome {
    /// All runs finished; carries the most recent snapshot.
    Completed(Snapshot),
    Cancelled,
}

/// Install a Ctrl+C listener and return the shutdown flag it sets.
pub fn spawn_ctrl_c() -> watch::Receiver<bool> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("cancellation requested");
            let _ = shutdown_tx.send(true);
        }
    });
    shutdown_rx
}

/// One scan, compare, print and report pass. Returns the new snapshot.
pub fn run_cycle(config: &CycleConfig, previous: &Snapshot, run: u32) -> Result<Snapshot> {
    let next = build_snapshot(&config.root, &config.patterns)
        .with_context(|| format!("scanning {}", config.root.display()))?;
    let changes = diff(previous, &next);

    if let Some(total) = config.total_runs {
        println!("\nRun {run}/{total}:");
    }
    print_summary(&changes, &config.root);

    write_report(&changes, &config.root, &config.output.path, config.output.mode)?;
    print_saved(&config.output.path, config.output.mode);
    Ok(next)
}

/// Run cycles per `schedule`, threading each snapshot into the next cycle.
pub async fn run_cycles(
    config: Arc<CycleConfig>,
    initial: Snapshot,
    schedule: Schedule,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<Outcome> {
    let mut previous = initial;
    let mut run: u32 = 0;

    loop {
        if *shutdown_rx.borrow() {
            return Ok(Outcome::Cancelled);
        }

        run += 1;
        let cfg = config.clone();
        previous = tokio::task::spawn_blocking(move || run_cycle(&cfg, &previous, run))
            .await
            .context("scan cycle panicked")??;
        debug!(run, files = previous.len(), "scan cycle finished");

        if schedule.max_runs.is_some_and(|max| run >= max) {
            return Ok(Outcome::Completed(previous));
        }

        tokio::select! {
            _ = tokio::time::sleep(schedule.interval) => {}
            changed = shutdown_rx.changed() => {
                match changed {
                    Ok(()) if *shutdown_rx.borrow() => {
                        return Ok(Outcome::Cancelled);
                    }
                    Ok(()) => {}
                    // Listener is gone; nothing can cancel any more.
                    Err(_) => tokio::time::sleep(schedule.interval).await,
                }
            }
        }
    }
}
