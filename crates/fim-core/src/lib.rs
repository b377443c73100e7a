//! Snapshot and drift-detection engine for the `fim` file integrity monitor.
//!
//! A snapshot maps every tracked file under a root to its SHA-256 digest,
//! size and modification time. A baseline is a snapshot persisted as JSON;
//! later scans are diffed against it and the classified changes are written
//! to a report history.
//!
//! ```text
//!   load_ignore_patterns ──► build_snapshot ──► save_baseline
//!                                  │
//!                 load_baseline ──►├──► diff ──► write_report
//! ```
//!
//! Everything here is synchronous and holds no state between calls. Each
//! load/save is a fresh round trip to disk.

pub mod diff;
pub mod digest;
pub mod error;
pub mod filter;
pub mod paths;
pub mod report;
pub mod settings;
pub mod snapshot;
pub mod store;

pub use diff::{diff, ChangeSet};
pub use digest::{sha256_file, DIGEST_CHUNK_SIZE};
pub use error::{FimError, Result};
pub use filter::{is_ignored, load_ignore_patterns, PatternSet, IGNORE_FILE_NAME};
pub use report::{read_reports, write_report, Report, ReportMode};
pub use settings::FimSettings;
pub use snapshot::{build_snapshot, FileRecord, ScanStats, SkipReason, Snapshot, SnapshotBuilder};
pub use store::{
    load_baseline, load_baseline_document, save_baseline, Baseline, DEFAULT_BASELINE_NAME,
    SCHEMA_VERSION,
};
