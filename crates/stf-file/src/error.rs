use std::io;

use stf_core::{Severity, StfError};

use crate::session::OpenMode;

/// Errors from tree file sessions.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// The bytes themselves were rejected by the codec or the envelope.
    #[error(transparent)]
    Format(#[from] StfError),

    /// I/O error from the underlying file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The session was opened for the other direction.
    #[error("cannot {operation} a tree file opened for {mode}")]
    ModeMismatch {
        mode: OpenMode,
        operation: &'static str,
    },

    /// A session holds exactly one root object.
    #[error("tree file session already holds a root object")]
    AlreadyWritten,
}

impl FileError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Format(e) => e.severity(),
            Self::Io(_) | Self::ModeMismatch { .. } | Self::AlreadyWritten => Severity::Critical,
        }
    }

    /// The codec error behind this failure, if any.
    pub fn as_format(&self) -> Option<&StfError> {
        match self {
            Self::Format(e) => Some(e),
            _ => None,
        }
    }
}

/// Result alias for tree file operations.
pub type FileResult<T> = Result<T, FileError>;
