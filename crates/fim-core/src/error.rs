use std::path::{Path, PathBuf};

/// Result type for core operations
pub type Result<T> = std::result::Result<T, FimError>;

/// Fatal errors surfaced by the core.
///
/// Per-file problems met while walking a tree (permission denied, a file
/// vanishing mid-scan) are not represented here; the snapshot builder records
/// them as a [`SkipReason`](crate::snapshot::SkipReason) and moves on.
#[derive(Debug, thiserror::Error)]
pub enum FimError {
    #[error("root folder does not exist: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("baseline not found: {}", .0.display())]
    BaselineNotFound(PathBuf),

    #[error("invalid format in {}: {source}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot {op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FimError {
    pub(crate) fn io(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        FimError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn format(path: &Path, source: serde_json::Error) -> Self {
        FimError::Format {
            path: path.to_path_buf(),
            source,
        }
    }
}
