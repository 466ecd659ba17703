//! Error types for persistence backends.

use std::path::PathBuf;

use thiserror::Error;

use crate::user::Uid;

/// Errors raised while reading or writing persisted account state.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    /// A persisted document could not be decoded.
    #[error("Corrupt record at {location}: {reason}")]
    CorruptRecord {
        /// Uid of the record, when it could be determined
        uid: Option<Uid>,
        /// Where the document lives (file path or in-memory key)
        location: String,
        reason: String,
    },

    /// Serialization failed.
    #[error("Serialization failed")]
    SerializationFailed {
        #[source]
        source: serde_json::Error,
    },

    /// File I/O error.
    #[error("File I/O error at {path}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another process holds the data directory.
    #[error("Data directory is locked by another process: {path}")]
    DirectoryLocked { path: PathBuf },

    /// A write was rejected by the backend.
    #[error("Write rejected: {reason}")]
    WriteRejected { reason: String },
}

impl BackendError {
    pub fn is_corruption(&self) -> bool {
        matches!(self, BackendError::CorruptRecord { .. })
    }

    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            BackendError::FileIo { .. }
                | BackendError::SerializationFailed { .. }
                | BackendError::WriteRejected { .. }
        )
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, BackendError::DirectoryLocked { .. })
    }

    /// The uid of the record this error is about, if any.
    pub fn uid(&self) -> Option<Uid> {
        match self {
            BackendError::CorruptRecord { uid, .. } => *uid,
            _ => None,
        }
    }
}

impl From<BackendError> for crate::Error {
    fn from(err: BackendError) -> Self {
        crate::Error::Backend(err)
    }
}
