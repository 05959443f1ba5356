//! Error types for shelf operations.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias used throughout lazyshelf.
pub type Result<T, E = ShelfError> = std::result::Result<T, E>;

/// Errors that can occur while executing, recording or undoing operations.
#[derive(Debug, Error)]
pub enum ShelfError {
    /// A user-facing path could not be turned into an absolute path.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    /// Stat, read, write, create or remove failure.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source of a file copy is neither a regular file nor a symlink.
    #[error("{path} is not a regular file")]
    NotRegularFile { path: PathBuf },

    /// Source of a tree copy is not a directory.
    #[error("Source {path} is not a directory")]
    NotADirectory { path: PathBuf },

    /// The overwrite policy refuses to replace a directory.
    #[error("Cannot overwrite directory '{path}'")]
    DirectoryOverwriteDenied { path: PathBuf },

    /// No free " (n)" sibling name within the search bound.
    #[error("Failed to find free name for {path} after {attempts} attempts")]
    NoFreeName { path: PathBuf, attempts: u32 },

    /// A job record could not be (de)serialized.
    #[error("Job serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No persisted record exists for the job.
    #[error("Job not found: {id}")]
    JobNotFound { id: String },

    /// Another item of the same job already occupies this trash slot.
    #[error("Trash entry already exists: {path}")]
    TrashOccupied { path: PathBuf },

    /// Putting a directory inside itself.
    #[error("Cannot put {source_path} inside itself ({destination})")]
    DestinationInsideSource {
        source_path: PathBuf,
        destination: PathBuf,
    },

    /// A move copied everything to `destination` but could not remove the source.
    #[error("Copied {source_path} to {destination} but could not remove the source: {cause}")]
    SourceNotRemoved {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        cause: Box<ShelfError>,
    },
}

impl ShelfError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is an I/O error whose underlying kind is `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }

    /// The complete copy a failed move left behind, if any.
    pub fn kept_destination(&self) -> Option<&Path> {
        match self {
            Self::SourceNotRemoved { destination, .. } => Some(destination),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_keeps_path() {
        let err = ShelfError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, ShelfError::Io { .. }));
        assert!(err.to_string().contains("/test/path"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_is_not_found() {
        let err = ShelfError::io("/gone", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(err.is_not_found());

        let err = ShelfError::JobNotFound { id: "x".into() };
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_overwrite_denied_message() {
        let err = ShelfError::DirectoryOverwriteDenied {
            path: PathBuf::from("/b/dir"),
        };
        assert_eq!(err.to_string(), "Cannot overwrite directory '/b/dir'");
    }

    #[test]
    fn test_kept_destination() {
        let err = ShelfError::SourceNotRemoved {
            source_path: PathBuf::from("/a/dir"),
            destination: PathBuf::from("/b/dir"),
            cause: Box::new(ShelfError::io(
                "/a/dir/locked",
                std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            )),
        };
        assert_eq!(err.kept_destination(), Some(Path::new("/b/dir")));
        assert!(err.to_string().contains("/a/dir/locked"));
        assert!(std::error::Error::source(&err).is_some());

        let err = ShelfError::io("/x", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(err.kept_destination(), None);
    }
}
