//! Upload pipeline for Google Photos
//!
//! Turns a directory tree into albums:
//! - Scanning folders into an album tree with natural ordering
//! - Resolving folder names to remote albums, once per name
//! - Staging file bytes and committing them in bounded batches
//! - Progress events and an aggregated run summary

pub mod albums;
pub mod committer;
pub mod error;
pub mod media;
pub mod natural;
pub mod orchestrator;
pub mod progress;
pub mod scanner;
pub mod summary;
pub mod uploader;

pub use albums::{Album, AlbumResolver, ResolverOptions};
pub use committer::{BatchCommitter, BatchResult, ItemOutcome, ItemStatus};
pub use error::{Result, SyncError};
pub use natural::{natural_cmp, natural_sort, NaturalKey};
pub use orchestrator::{OrchestratorOptions, SyncOrchestrator};
pub use progress::{AlbumState, ProgressChannel, ProgressEvent, ProgressReporter};
pub use scanner::{DirectoryNode, MediaFile, PathScanner, ScanOptions};
pub use summary::{AlbumReport, FileFailure, RunSummary};
pub use uploader::{MediaUploader, UploadToken};

#[cfg(test)]
mod testing;
