use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fim_core::paths::settings_path;
use fim_core::settings::{load_settings, FimSettings};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod schedule;

use crate::commands::{OutputOptions, ScanOptions, Target};

#[derive(Parser, Debug)]
#[command(
    name = "fim",
    author,
    version,
    about = "File Integrity Monitor: baseline a folder and detect changes",
    long_about = None
)]
struct Cli {
    /// Root directory to monitor
    root: PathBuf,

    /// Settings file (defaults to $FIM_CONFIG or the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct TargetArgs {
    /// Comma-separated ignore globs (e.g. "*.log,*.tmp")
    #[arg(long)]
    ignore: Option<String>,

    /// Baseline file path (default: ROOT/.fim_baseline.json)
    #[arg(long)]
    baseline: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Write report here (json or ndjson)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Append results instead of overwriting
    #[arg(long, overrides_with = "no_append")]
    append: bool,

    /// Overwrite the report even if settings enable append
    #[arg(long, overrides_with = "append")]
    no_append: bool,

    /// Emit newline-delimited JSON (one object per line)
    #[arg(long, overrides_with = "no_ndjson")]
    ndjson: bool,

    /// Emit a JSON array even if settings enable ndjson
    #[arg(long, overrides_with = "ndjson")]
    no_ndjson: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a baseline snapshot for ROOT
    Init {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Compare current state to the baseline and emit a report
    Scan {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        output: OutputArgs,
        /// Seconds between scans (0 = back to back)
        #[arg(long)]
        interval: Option<u64>,
        /// Number of scans to run
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        max_runs: Option<u32>,
        /// After finishing the scan(s), make the current state the baseline
        #[arg(long)]
        accept_baseline: bool,
    },
    /// Promote the current on-disk state to the baseline
    Accept {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Continuously scan and report changes until Ctrl+C
    Monitor {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        output: OutputArgs,
        /// Seconds between scans
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let settings = load_cli_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { target } => {
            let target = resolve(&cli.root, &target, &settings, None)?;
            commands::init(&target)
        }
        Commands::Accept { target } => {
            let target = resolve(&cli.root, &target, &settings, None)?;
            commands::accept(&target)
        }
        Commands::Scan {
            target,
            output,
            interval,
            max_runs,
            accept_baseline,
        } => {
            let output = output_options(&output, &settings);
            let target = resolve(&cli.root, &target, &settings, Some(&output.path))?;
            let opts = ScanOptions {
                interval_secs: interval.unwrap_or(settings.scan.interval_secs),
                max_runs: max_runs.unwrap_or(settings.scan.max_runs).max(1),
                accept_baseline,
            };
            commands::scan(target, output, opts).await
        }
        Commands::Monitor {
            target,
            output,
            interval,
        } => {
            let output = output_options(&output, &settings);
            let target = resolve(&cli.root, &target, &settings, Some(&output.path))?;
            let interval_secs = interval.unwrap_or(settings.monitor.interval_secs);
            commands::monitor(target, output, interval_secs).await
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("FIM_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_cli_settings(explicit: Option<&Path>) -> Result<FimSettings> {
    let path = match explicit.map(Path::to_path_buf).or_else(settings_path) {
        Some(p) => p,
        None => return Ok(FimSettings::default()),
    };
    load_settings(&path).with_context(|| format!("loading settings from {}", path.display()))
}

fn resolve(
    root: &Path,
    args: &TargetArgs,
    settings: &FimSettings,
    report: Option<&Path>,
) -> Result<Target> {
    Target::resolve(
        root,
        args.ignore.as_deref(),
        args.baseline.as_deref(),
        &settings.ignore,
        report,
    )
}

fn output_options(args: &OutputArgs, settings: &FimSettings) -> OutputOptions {
    OutputOptions::new(
        args.out.clone().unwrap_or_else(|| settings.report.path.clone()),
        flag(args.append, args.no_append, settings.report.append),
        flag(args.ndjson, args.no_ndjson, settings.report.ndjson),
    )
}

/// A `--x` / `--no-x` pair wins over the settings value.
fn flag(on: bool, off: bool, fallback: bool) -> bool {
    if on {
        true
    } else if off {
        false
    } else {
        fallback
    }
}
