//! Error types for theme operations
//!
//! Every failure maps onto a small taxonomy (`ErrorKind`) that the command
//! line uses to pick an exit status and summary wording.

use std::path::PathBuf;

use pvetheme_hal::HalError;
use serde::Serialize;

/// Result type for all pvetheme core operations
pub type ThemeResult<T> = Result<T, ThemeError>;

/// Coarse classification of errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Host not in a state that allows the operation (missing paths, no root)
    PreconditionFailure,
    /// A snapshot with the same id already exists
    Conflict,
    /// Snapshot, theme or insertion point missing
    NotFound,
    /// Some files in a sweep failed while others succeeded
    PartialFailure,
    /// Template cannot be edited safely; nothing was written
    Fatal,
    Io,
    Config,
}

#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error("install root not found: {}", .0.display())]
    RootMissing(PathBuf),

    #[error("template not found: {}", .0.display())]
    TemplateMissing(PathBuf),

    #[error("snapshot {0} already exists")]
    SnapshotConflict(String),

    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("no snapshots found in {}", .0.display())]
    NoSnapshotsFound(PathBuf),

    #[error("invalid snapshot id '{0}' (expected YYYYMMDD-HHMMSS)")]
    InvalidSnapshotId(String),

    #[error("theme not found: {0}")]
    ThemeNotFound(String),

    #[error("no closing </head> tag in template; refusing to patch")]
    TagNotFound,

    #[error("template loader block is malformed: {0}")]
    MalformedTemplate(String),

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error(transparent)]
    Hal(#[from] HalError),
}

impl ThemeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ThemeError::RootMissing(_)
            | ThemeError::TemplateMissing(_)
            | ThemeError::InvalidSelection(_)
            | ThemeError::InvalidSnapshotId(_) => ErrorKind::PreconditionFailure,
            ThemeError::Hal(HalError::Security(_)) => ErrorKind::PreconditionFailure,
            ThemeError::SnapshotConflict(_) => ErrorKind::Conflict,
            ThemeError::SnapshotNotFound(_)
            | ThemeError::NoSnapshotsFound(_)
            | ThemeError::ThemeNotFound(_) => ErrorKind::NotFound,
            ThemeError::TagNotFound | ThemeError::MalformedTemplate(_) => ErrorKind::Fatal,
            ThemeError::Config(_) => ErrorKind::Config,
            ThemeError::Catalog(_) | ThemeError::Metadata(_) | ThemeError::Hal(_) => ErrorKind::Io,
        }
    }
}
