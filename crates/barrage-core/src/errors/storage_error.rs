//! Storage-layer errors for the findings archive.

use super::error_code::{self, BarrageErrorCode};

/// Errors that can occur in the archive layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("Cannot open findings archive '{url}': {message}")]
    OpenFailed { url: String, message: String },

    /// A suspicious observation had nowhere to go: no archive is bound
    /// and a finding must never be silently lost.
    #[error("{diagnostic}")]
    FindingUnrecorded { diagnostic: String },
}

impl BarrageErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::SqliteError { .. } => error_code::STORAGE_ERROR,
            Self::OpenFailed { .. } => error_code::STORAGE_OPEN_FAILED,
            Self::FindingUnrecorded { .. } => error_code::FINDING_UNRECORDED,
        }
    }
}
