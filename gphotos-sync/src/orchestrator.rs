//! Drives an upload run: album resolution, staging and commit per folder

use std::path::Path;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use gphotos_core::api::{PhotoLibrary, RetryPolicy};
use gphotos_core::UploadConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::albums::{AlbumResolver, ResolverOptions};
use crate::committer::{BatchCommitter, ItemStatus};
use crate::error::{Result, SyncError};
use crate::progress::{AlbumState, ProgressReporter};
use crate::scanner::{DirectoryNode, MediaFile, PathScanner};
use crate::summary::{AlbumReport, FileFailure, RunSummary};
use crate::uploader::{MediaUploader, UploadToken};

/// Options for an upload run
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Albums processed at the same time
    pub album_concurrency: usize,
    /// Staging calls in flight per album
    pub upload_concurrency: usize,
    pub batch_size: usize,
    /// Commit files directly in the root folder as loose library items
    pub upload_root_files: bool,
    pub resolver: ResolverOptions,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            album_concurrency: 2,
            upload_concurrency: 4,
            batch_size: gphotos_core::MAX_BATCH_SIZE,
            upload_root_files: false,
            resolver: ResolverOptions::default(),
        }
    }
}

impl From<&UploadConfig> for OrchestratorOptions {
    fn from(config: &UploadConfig) -> Self {
        let upload = &config.upload;
        Self {
            album_concurrency: upload.album_concurrency,
            upload_concurrency: upload.upload_concurrency,
            batch_size: upload.batch_size,
            upload_root_files: upload.upload_root_files,
            resolver: ResolverOptions {
                matching: upload.album_match,
                app_created_only: upload.app_created_only,
            },
        }
    }
}

/// Work for one album: its title (or `None` for loose items) and files
struct AlbumJob<'a> {
    name: Option<&'a str>,
    path: &'a Path,
    files: &'a [MediaFile],
}

struct AlbumOutcome {
    report: AlbumReport,
    failures: Vec<FileFailure>,
}

/// Where each file of an album ended up after staging
enum Staged {
    Skipped,
    Failed(FileFailure),
    Token(u64),
}

/// Runs one upload pass. The album cache lives as long as the orchestrator,
/// so create one per run.
pub struct SyncOrchestrator {
    resolver: AlbumResolver,
    uploader: MediaUploader,
    committer: BatchCommitter,
    options: OrchestratorOptions,
    cancel: CancellationToken,
    reporter: Option<ProgressReporter>,
}

impl SyncOrchestrator {
    pub fn new(library: Arc<dyn PhotoLibrary>, retry: RetryPolicy, options: OrchestratorOptions) -> Self {
        let cancel = CancellationToken::new();
        Self {
            resolver: AlbumResolver::new(library.clone(), retry, options.resolver),
            uploader: MediaUploader::new(library.clone(), retry),
            committer: BatchCommitter::new(library, retry, options.batch_size)
                .with_cancellation(cancel.clone()),
            options,
            cancel,
            reporter: None,
        }
    }

    pub fn from_config(library: Arc<dyn PhotoLibrary>, config: &UploadConfig) -> Self {
        Self::new(library, config.retry_policy(), OrchestratorOptions::from(config))
    }

    pub fn with_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Use an externally owned abort token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.committer = self.committer.with_cancellation(cancel.clone());
        self.cancel = cancel;
        self
    }

    /// Token that aborts the run when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Scan `root` and upload every album below it. A bad root is the only
    /// error; it is returned before any remote call.
    pub async fn upload_directory(&self, scanner: &PathScanner, root: impl AsRef<Path>) -> Result<RunSummary> {
        let tree = scanner.scan(root)?;
        Ok(self.run(&tree).await)
    }

    /// Upload explicit files into one album, or as loose items without a name
    pub async fn upload_files<P: AsRef<Path>>(
        &self,
        scanner: &PathScanner,
        album: Option<&str>,
        paths: &[P],
    ) -> Result<RunSummary> {
        let files = scanner.collect_files(paths)?;
        Ok(self.run_files(album, &files).await)
    }

    /// Upload a scanned tree. Every folder with media becomes an album named
    /// after the folder; failures are recorded, never propagated.
    pub async fn run(&self, root: &DirectoryNode) -> RunSummary {
        let mut jobs = Vec::new();

        if !root.files.is_empty() {
            if self.options.upload_root_files {
                jobs.push(AlbumJob {
                    name: None,
                    path: &root.path,
                    files: &root.files,
                });
            } else {
                warn!(
                    path = %root.path.display(),
                    files = root.files.len(),
                    "Skipping files in the root folder, they belong to no album"
                );
            }
        }

        for node in root.descendants() {
            if node.files.is_empty() {
                debug!(album = %node.name, "No media files, no album needed");
                continue;
            }
            jobs.push(AlbumJob {
                name: Some(node.name.as_str()),
                path: &node.path,
                files: &node.files,
            });
        }

        self.execute(jobs).await
    }

    /// Upload an already collected file list as a single album. An empty list
    /// resolves no album.
    pub async fn run_files(&self, album: Option<&str>, files: &[MediaFile]) -> RunSummary {
        if files.is_empty() {
            debug!(album = ?album, "No media files, no album needed");
            return self.execute(Vec::new()).await;
        }

        let path = files
            .first()
            .and_then(|file| file.path.parent())
            .unwrap_or_else(|| Path::new(""));

        self.execute(vec![AlbumJob { name: album, path, files }]).await
    }

    async fn execute(&self, jobs: Vec<AlbumJob<'_>>) -> RunSummary {
        let mut summary = RunSummary::new();
        let files: usize = jobs.iter().map(|job| job.files.len()).sum();
        let bytes: u64 = jobs.iter().flat_map(|job| job.files).map(|file| file.size).sum();

        info!(run_id = %summary.run_id, albums = jobs.len(), files, "Starting upload run");
        if let Some(reporter) = &self.reporter {
            reporter.run_started(summary.run_id, jobs.len(), files, bytes);
        }

        let outcomes: Vec<AlbumOutcome> = stream::iter(jobs)
            .map(|job| self.process_album(job))
            .buffered(self.options.album_concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            summary.record_album(outcome.report, outcome.failures);
        }
        summary.record_albums(&self.resolver.resolved_albums().await);
        summary.aborted = self.cancel.is_cancelled();
        summary.complete();

        if let Some(reporter) = &self.reporter {
            reporter.run_finished(
                summary.run_id,
                summary.files_uploaded,
                summary.files_failed,
                summary.aborted,
            );
        }

        summary
    }

    async fn process_album(&self, job: AlbumJob<'_>) -> AlbumOutcome {
        let mut report = AlbumReport::new(job.name, job.path);
        let label = report.label().to_string();

        if self.cancel.is_cancelled() {
            report.files_skipped = job.files.len();
            return self.fail(report, SyncError::Cancelled.to_string());
        }

        self.transition(&mut report, AlbumState::Resolving);
        let album = match job.name {
            Some(name) => match self.resolver.resolve(name).await {
                Ok(album) => Some(album),
                Err(e) => {
                    error!(album = %name, files = job.files.len(), "{}", e);
                    report.files_skipped = job.files.len();
                    return self.fail(report, e.to_string());
                }
            },
            None => None,
        };

        self.transition(&mut report, AlbumState::Uploading);
        let results: Vec<Option<Result<UploadToken>>> = stream::iter(job.files)
            .map(|file| self.stage_file(&label, file))
            .buffered(self.options.upload_concurrency.max(1))
            .collect()
            .await;

        let mut staged = Vec::with_capacity(results.len());
        let mut tokens = Vec::new();
        for (file, result) in job.files.iter().zip(results) {
            match result {
                None => staged.push(Staged::Skipped),
                Some(Err(e)) => staged.push(Staged::Failed(FileFailure {
                    path: file.path.clone(),
                    reason: e.to_string(),
                })),
                Some(Ok(token)) => {
                    staged.push(Staged::Token(file.size));
                    tokens.push(token);
                }
            }
        }

        let mut interrupted = self.cancel.is_cancelled();
        let mut committed = Vec::new().into_iter();
        if !interrupted && !tokens.is_empty() {
            self.transition(&mut report, AlbumState::Committing);
            let result = self.committer.commit(album.as_ref(), &tokens).await;
            if let Some(reporter) = &self.reporter {
                reporter.batch_committed(&label, result.items.len(), result.succeeded());
            }
            interrupted = result.batches_skipped > 0;
            committed = result.items.into_iter();
        }

        let mut failures = Vec::new();
        for entry in staged {
            match entry {
                Staged::Skipped => report.files_skipped += 1,
                Staged::Failed(failure) => failures.push(failure),
                Staged::Token(size) => match committed.next() {
                    Some(item) => match item.status {
                        ItemStatus::Added { .. } => {
                            report.files_uploaded += 1;
                            report.bytes_uploaded += size;
                        }
                        ItemStatus::Failed { reason } => failures.push(FileFailure {
                            path: item.path,
                            reason,
                        }),
                    },
                    // Staged but never committed
                    None => report.files_skipped += 1,
                },
            }
        }
        report.files_failed = failures.len();

        if interrupted {
            let mut outcome = self.fail(report, SyncError::Cancelled.to_string());
            outcome.failures = failures;
            return outcome;
        }

        info!(
            album = %label,
            uploaded = report.files_uploaded,
            failed = report.files_failed,
            "Album finished"
        );
        self.transition(&mut report, AlbumState::Done);
        AlbumOutcome { report, failures }
    }

    /// Stage one file unless the run has been aborted
    async fn stage_file(&self, album: &str, file: &MediaFile) -> Option<Result<UploadToken>> {
        if self.cancel.is_cancelled() {
            return None;
        }

        let result = self.uploader.stage(file).await;
        if let Some(reporter) = &self.reporter {
            let path = file.path.display().to_string();
            match &result {
                Ok(_) => reporter.file_staged(album, path, file.size),
                Err(e) => reporter.file_failed(album, path, e.to_string()),
            }
        }
        Some(result)
    }

    fn fail(&self, mut report: AlbumReport, error: String) -> AlbumOutcome {
        report.error = Some(error);
        self.transition(&mut report, AlbumState::Failed);
        AlbumOutcome {
            report,
            failures: Vec::new(),
        }
    }

    fn transition(&self, report: &mut AlbumReport, state: AlbumState) {
        debug!(album = %report.label(), from = %report.state, to = %state, "Album state changed");
        report.state = state;
        if let Some(reporter) = &self.reporter {
            reporter.album_state(report.label(), state);
        }
    }
}
