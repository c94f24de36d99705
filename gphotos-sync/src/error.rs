//! Error types for the upload pipeline

use std::path::PathBuf;

use gphotos_core::PhotosError;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Failures of the upload pipeline, from the widest scope to the narrowest.
///
/// Only `InvalidInput` ever escapes a run; the other variants are recorded in
/// the [`RunSummary`](crate::summary::RunSummary) for the album, batch or file
/// they belong to.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Bad root path or arguments, detected before any remote call
    #[error("Invalid input '{path}': {message}")]
    InvalidInput { path: PathBuf, message: String },

    /// Album listing or creation failed after retries
    #[error("Album '{album}' could not be resolved: {source}")]
    RemoteService {
        album: String,
        #[source]
        source: PhotosError,
    },

    /// Staging a single file failed after retries
    #[error("Upload of '{path}' failed: {cause}")]
    Upload { path: PathBuf, cause: String },

    /// Committing a batch of staged items failed after retries
    #[error("Commit of {items} item(s) failed: {cause}")]
    Commit { items: usize, cause: String },

    /// The run was aborted before this work was attempted
    #[error("Operation was cancelled")]
    Cancelled,
}

impl SyncError {
    /// Create a new invalid input error
    pub fn invalid_input(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new remote service error for an album
    pub fn remote_service(album: impl Into<String>, source: PhotosError) -> Self {
        Self::RemoteService {
            album: album.into(),
            source,
        }
    }

    /// Create a new upload error
    pub fn upload_error(path: impl Into<PathBuf>, cause: impl ToString) -> Self {
        Self::Upload {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    /// Create a new commit error
    pub fn commit_error(items: usize, cause: impl ToString) -> Self {
        Self::Commit {
            items,
            cause: cause.to_string(),
        }
    }

    /// Whether the error aborts the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_invalid_input_is_fatal() {
        assert!(SyncError::invalid_input("/missing", "Directory does not exist").is_fatal());
        assert!(!SyncError::upload_error("/a.jpg", "boom").is_fatal());
        assert!(!SyncError::commit_error(3, "boom").is_fatal());
        assert!(!SyncError::remote_service("Events", PhotosError::NotFound("x".into())).is_fatal());
    }

    #[test]
    fn test_messages() {
        let err = SyncError::upload_error("/photos/a.jpg", "Server error: 503 - down");
        assert_eq!(err.to_string(), "Upload of '/photos/a.jpg' failed: Server error: 503 - down");

        let err = SyncError::commit_error(2, "timeout");
        assert_eq!(err.to_string(), "Commit of 2 item(s) failed: timeout");
    }
}
