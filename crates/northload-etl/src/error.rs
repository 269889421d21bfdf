//! Error taxonomy for the load pipeline
//!
//! Every job failure maps to exactly one [`ErrorKind`]. The orchestrator
//! catches these at the job boundary; only [`EtlError::Config`] stops a batch
//! from starting.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for pipeline operations
pub type EtlResult<T> = std::result::Result<T, EtlError>;

#[derive(Error, Debug)]
pub enum EtlError {
    /// Source file missing, unreadable, or malformed
    #[error("source {} unavailable: {reason}", .path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    /// No destination configured for the dataset key
    #[error("no destination configured for dataset '{0}'")]
    UnknownDataset(String),

    /// Destination table could not be dropped or created
    #[error("could not rebuild {table}: {reason}")]
    SchemaConflict { table: String, reason: String },

    /// Rows could not be written to the destination table
    #[error("could not write rows to {table}: {reason}")]
    WriteFailure { table: String, reason: String },

    /// Configuration missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Taxonomy name of an [`EtlError`], as shown in batch summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    SourceUnavailable,
    UnknownDataset,
    SchemaConflict,
    WriteFailure,
    Config,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::SourceUnavailable => "SourceUnavailable",
            ErrorKind::UnknownDataset => "UnknownDataset",
            ErrorKind::SchemaConflict => "SchemaConflict",
            ErrorKind::WriteFailure => "WriteFailure",
            ErrorKind::Config => "Config",
        };
        f.write_str(name)
    }
}

impl EtlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EtlError::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            EtlError::UnknownDataset(_) => ErrorKind::UnknownDataset,
            EtlError::SchemaConflict { .. } => ErrorKind::SchemaConflict,
            EtlError::WriteFailure { .. } => ErrorKind::WriteFailure,
            EtlError::Config(_) => ErrorKind::Config,
        }
    }

    pub fn source_unavailable(path: &Path, reason: impl std::fmt::Display) -> Self {
        Self::SourceUnavailable {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn schema_conflict(table: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        Self::SchemaConflict {
            table: table.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn write_failure(table: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        Self::WriteFailure {
            table: table.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
