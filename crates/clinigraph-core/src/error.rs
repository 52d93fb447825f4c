//! Error types for Clinigraph

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using Clinigraph's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Clinigraph error types with helpful messages and suggestions
///
/// Missing cases, missing concepts and empty record sets are not errors:
/// the graph operations return empty results for them. Only persistence,
/// record parsing and task failures surface here. Configuration errors
/// are reported through `anyhow` by the config module.
#[derive(Error, Debug)]
pub enum Error {
    // Snapshot errors (E100-E199)
    #[error("Graph snapshot not found at {0}. Run `clinigraph build` to create one.")]
    SnapshotNotFound(PathBuf),

    #[error("Graph snapshot is corrupt: {0}")]
    SnapshotCorrupt(String),

    #[error("Unsupported snapshot format version {found} (expected {expected}). Rebuild the graph.")]
    SnapshotVersion { found: u32, expected: u32 },

    // Record store errors (E200-E299)
    #[error("Record file not found: {0}")]
    RecordsNotFound(PathBuf),

    #[error("Parse error: {0}")]
    Parse(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::SnapshotNotFound(_) => "E100",
            Self::SnapshotCorrupt(_) => "E101",
            Self::SnapshotVersion { .. } => "E102",
            Self::RecordsNotFound(_) => "E200",
            Self::Parse(_) => "E201",
            Self::Other(_) | Self::Io(_) | Self::Json(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::SnapshotNotFound(_) | Self::SnapshotCorrupt(_) | Self::SnapshotVersion { .. } => {
                Some("clinigraph build".to_string())
            }
            Self::RecordsNotFound(path) => Some(format!(
                "clinigraph build --records-dir {}",
                path.parent().map(|p| p.display().to_string()).unwrap_or_else(|| ".".into())
            )),
            _ => None,
        }
    }

    /// Whether the failure came from reading or writing a graph snapshot
    pub fn is_snapshot_error(&self) -> bool {
        matches!(
            self,
            Self::SnapshotNotFound(_) | Self::SnapshotCorrupt(_) | Self::SnapshotVersion { .. }
        )
    }
}
