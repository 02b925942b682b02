//! Error taxonomy for file operations.
//!
//! Every variant carries the client's logical path only. Host filesystem
//! paths never appear in a `FileError`, so `Display` output is safe to send
//! back to clients.

use std::io;

use indexfo_protocol::{ErrorCode, ErrorMessage};
use thiserror::Error;

/// Errors produced by the resolver, indexer, navigator and transfer engine.
#[derive(Debug, Error)]
pub enum FileError {
    /// The path is malformed or escapes the root.
    #[error("path escapes the shared root: {path}")]
    PathTraversal { path: String },

    /// The path does not exist.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// A directory was required.
    #[error("not a directory: {path}")]
    NotADirectory { path: String },

    /// A regular file was required.
    #[error("is a directory: {path}")]
    IsADirectory { path: String },

    /// The operating system refused access.
    #[error("permission denied: {path}")]
    PermissionDenied { path: String },

    /// The requested byte range cannot be satisfied.
    #[error("range not satisfiable for {path} (size {size})")]
    InvalidRange { path: String, size: u64 },

    /// The transfer stopped before completion.
    #[error("transfer interrupted: {path} ({reason})")]
    TransferInterrupted { path: String, reason: String },

    /// An upload exceeded the configured maximum size.
    #[error("upload too large: {path} exceeds {limit} bytes")]
    UploadTooLarge { path: String, limit: u64 },

    /// The destination name is already taken.
    #[error("name conflict: {path}")]
    NameConflict { path: String },

    /// Unclassified I/O failure.
    #[error("I/O error on {path}: {kind}")]
    Io { path: String, kind: io::ErrorKind },
}

/// Result type alias for file operations.
pub type FileResult<T> = Result<T, FileError>;

impl FileError {
    /// Map an I/O error from an operation on `path` into the taxonomy.
    pub fn from_io(err: &io::Error, path: &str) -> Self {
        let path = path.to_string();
        match err.kind() {
            io::ErrorKind::NotFound => FileError::NotFound { path },
            io::ErrorKind::PermissionDenied => FileError::PermissionDenied { path },
            io::ErrorKind::NotADirectory => FileError::NotADirectory { path },
            io::ErrorKind::IsADirectory => FileError::IsADirectory { path },
            io::ErrorKind::AlreadyExists => FileError::NameConflict { path },
            kind => FileError::Io { path, kind },
        }
    }

    pub(crate) fn interrupted(path: &str, reason: impl Into<String>) -> Self {
        FileError::TransferInterrupted {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// The protocol error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            FileError::PathTraversal { .. } => ErrorCode::PathTraversal,
            FileError::NotFound { .. } => ErrorCode::NotFound,
            FileError::NotADirectory { .. } => ErrorCode::NotADirectory,
            FileError::IsADirectory { .. } => ErrorCode::IsADirectory,
            FileError::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            FileError::InvalidRange { .. } => ErrorCode::InvalidRange,
            FileError::TransferInterrupted { .. } => ErrorCode::TransferInterrupted,
            FileError::UploadTooLarge { .. } => ErrorCode::UploadTooLarge,
            FileError::NameConflict { .. } => ErrorCode::NameConflict,
            FileError::Io { .. } => ErrorCode::InternalError,
        }
    }

    /// The logical path the error refers to.
    pub fn logical_path(&self) -> &str {
        match self {
            FileError::PathTraversal { path }
            | FileError::NotFound { path }
            | FileError::NotADirectory { path }
            | FileError::IsADirectory { path }
            | FileError::PermissionDenied { path }
            | FileError::InvalidRange { path, .. }
            | FileError::TransferInterrupted { path, .. }
            | FileError::UploadTooLarge { path, .. }
            | FileError::NameConflict { path }
            | FileError::Io { path, .. } => path,
        }
    }

    /// Convert to the user-safe protocol payload.
    pub fn to_error_message(&self) -> ErrorMessage {
        ErrorMessage {
            code: self.code(),
            message: self.to_string(),
            path: Some(self.logical_path().to_string()),
        }
    }
}

impl From<FileError> for io::Error {
    fn from(err: FileError) -> Self {
        let kind = match &err {
            FileError::NotFound { .. } => io::ErrorKind::NotFound,
            FileError::PermissionDenied { .. } => io::ErrorKind::PermissionDenied,
            FileError::NameConflict { .. } => io::ErrorKind::AlreadyExists,
            // Not `Interrupted`: std readers retry that kind.
            FileError::TransferInterrupted { .. } => io::ErrorKind::UnexpectedEof,
            FileError::InvalidRange { .. } | FileError::PathTraversal { .. } => {
                io::ErrorKind::InvalidInput
            }
            FileError::UploadTooLarge { .. } => io::ErrorKind::FileTooLarge,
            FileError::NotADirectory { .. } => io::ErrorKind::NotADirectory,
            FileError::IsADirectory { .. } => io::ErrorKind::IsADirectory,
            FileError::Io { kind, .. } => *kind,
        };
        io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_maps_kinds() {
        let err = io::Error::from(io::ErrorKind::NotFound);
        assert!(matches!(
            FileError::from_io(&err, "a/b"),
            FileError::NotFound { .. }
        ));

        let err = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(
            FileError::from_io(&err, "a/b"),
            FileError::PermissionDenied { .. }
        ));

        let err = io::Error::from(io::ErrorKind::StorageFull);
        assert!(matches!(
            FileError::from_io(&err, "a/b"),
            FileError::Io { kind: io::ErrorKind::StorageFull, .. }
        ));
    }

    #[test]
    fn test_error_message_carries_logical_path_only() {
        let err = FileError::NotFound {
            path: "docs/report.pdf".to_string(),
        };
        let msg = err.to_error_message();

        assert_eq!(msg.code, ErrorCode::NotFound);
        assert_eq!(msg.path.as_deref(), Some("docs/report.pdf"));
        assert_eq!(msg.message, "not found: docs/report.pdf");
    }

    #[test]
    fn test_invalid_range_display() {
        let err = FileError::InvalidRange {
            path: "a.bin".to_string(),
            size: 10,
        };
        assert_eq!(err.to_string(), "range not satisfiable for a.bin (size 10)");
        assert_eq!(err.code().http_status(), 416);
    }

    #[test]
    fn test_into_io_error() {
        let err: io::Error = FileError::interrupted("a.bin", "file was deleted").into();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(err.to_string().contains("a.bin"));
    }
}
