//! Batch commit of staged uploads into an album or the library

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use gphotos_core::api::{
    BatchCreateResponse, NewMediaItem, NewMediaItemResult, PhotoLibrary, RetryPolicy,
};
use gphotos_core::MAX_BATCH_SIZE;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::albums::Album;
use crate::error::SyncError;
use crate::summary::LIBRARY_LABEL;
use crate::uploader::UploadToken;

/// Outcome of one staged item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    Added { media_id: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub path: PathBuf,
    pub file_name: String,
    pub status: ItemStatus,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ItemStatus::Added { .. })
    }
}

/// Per-item outcomes of committing a set of tokens, in original file order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub items: Vec<ItemOutcome>,
    /// Batch-create calls that returned a response
    pub batches_committed: usize,
    /// Batch-create calls that failed after retries
    pub batches_failed: usize,
    /// Batches never sent because the run was aborted
    pub batches_skipped: usize,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|item| item.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }
}

/// Groups tokens into bounded batches and attaches them with one call each
pub struct BatchCommitter {
    library: Arc<dyn PhotoLibrary>,
    retry: RetryPolicy,
    batch_size: usize,
    cancel: CancellationToken,
}

impl BatchCommitter {
    /// `batch_size` is clamped to the service limit of 50 items
    pub fn new(library: Arc<dyn PhotoLibrary>, retry: RetryPolicy, batch_size: usize) -> Self {
        Self {
            library,
            retry,
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
            cancel: CancellationToken::new(),
        }
    }

    /// Stop issuing batch calls once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Commit `tokens` into `album`, or as loose library items when `None`.
    ///
    /// A failed batch marks only its own items as failed; later batches are
    /// still attempted.
    pub async fn commit(&self, album: Option<&Album>, tokens: &[UploadToken]) -> BatchResult {
        let album_id = album.map(|a| a.id.as_str());
        let album_name = album.map(|a| a.name.as_str()).unwrap_or(LIBRARY_LABEL);
        let mut result = BatchResult::default();

        for (index, chunk) in tokens.chunks(self.batch_size).enumerate() {
            if self.cancel.is_cancelled() {
                warn!(album = %album_name, batch = index, "Run aborted, batch not committed");
                result.batches_skipped += 1;
                fail_all(&mut result, chunk, &SyncError::Cancelled.to_string());
                continue;
            }

            let items: Vec<NewMediaItem> = chunk.iter().map(UploadToken::to_media_item).collect();
            debug!(album = %album_name, batch = index, items = items.len(), "Committing batch");

            match self
                .retry
                .run("batch create", || self.library.batch_create(album_id, &items))
                .await
            {
                Ok(response) => {
                    result.batches_committed += 1;
                    merge_response(&mut result, chunk, response, album_name);
                }
                Err(e) => {
                    let err = SyncError::commit_error(chunk.len(), e);
                    error!(album = %album_name, batch = index, "{}", err);
                    result.batches_failed += 1;
                    fail_all(&mut result, chunk, &err.to_string());
                }
            }
        }

        result
    }
}

fn fail_all(result: &mut BatchResult, chunk: &[UploadToken], reason: &str) {
    result.items.extend(chunk.iter().map(|token| ItemOutcome {
        path: token.file.path.clone(),
        file_name: token.file.file_name.clone(),
        status: ItemStatus::Failed {
            reason: reason.to_string(),
        },
    }));
}

/// Match results to tokens by upload token, falling back to position for
/// results that do not echo their token
fn merge_response(
    result: &mut BatchResult,
    chunk: &[UploadToken],
    response: BatchCreateResponse,
    album_name: &str,
) {
    let results = response.new_media_item_results;
    let by_token: HashMap<&str, &NewMediaItemResult> = results
        .iter()
        .filter_map(|r| r.upload_token.as_deref().map(|t| (t, r)))
        .collect();

    for (position, token) in chunk.iter().enumerate() {
        let item_result = by_token.get(token.token.as_str()).copied().or_else(|| {
            results
                .get(position)
                .filter(|r| r.upload_token.is_none())
        });

        let status = match item_result {
            Some(r) if r.is_success() => {
                info!(album = %album_name, file = %token.file.file_name, "Added to library and album");
                ItemStatus::Added {
                    media_id: r.media_item.as_ref().map(|m| m.id.clone()).unwrap_or_default(),
                }
            }
            Some(r) => {
                let reason = format!(
                    "Could not add '{}' to library: {}",
                    token.file.file_name,
                    r.failure_message()
                );
                error!(album = %album_name, "{}", reason);
                ItemStatus::Failed { reason }
            }
            None => {
                let reason = format!(
                    "Could not add '{}' to library: no result returned",
                    token.file.file_name
                );
                error!(album = %album_name, "{}", reason);
                ItemStatus::Failed { reason }
            }
        };

        result.items.push(ItemOutcome {
            path: token.file.path.clone(),
            file_name: token.file.file_name.clone(),
            status,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::MediaFile;
    use crate::testing::FakeLibrary;
    use chrono::Utc;

    fn tokens(count: usize) -> Vec<UploadToken> {
        (1..=count)
            .map(|n| {
                let name = format!("IMG_{}.jpg", n);
                UploadToken {
                    token: format!("token:{}", name),
                    file: MediaFile::new(format!("/photos/{}", name), 1),
                    uploaded_at: Utc::now(),
                }
            })
            .collect()
    }

    fn album() -> Album {
        Album {
            name: "Events".to_string(),
            id: "album-1".to_string(),
            created: true,
        }
    }

    #[tokio::test]
    async fn test_batch_boundaries_and_order() {
        let library = Arc::new(FakeLibrary::new());
        let committer = BatchCommitter::new(library.clone(), RetryPolicy::immediate(3), 50);
        let tokens = tokens(120);

        let result = committer.commit(Some(&album()), &tokens).await;

        assert_eq!(library.batch_sizes(), vec![50, 50, 20]);
        assert_eq!(result.batches_committed, 3);
        assert_eq!(result.succeeded(), 120);
        let order: Vec<&str> = result.items.iter().map(|i| i.file_name.as_str()).collect();
        let expected: Vec<String> = tokens.iter().map(|t| t.file.file_name.clone()).collect();
        assert_eq!(order, expected);
        assert_eq!(
            result.items[0].status,
            ItemStatus::Added {
                media_id: "media:IMG_1.jpg".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_stop_others() {
        let mut fake = FakeLibrary::new();
        // First call of the second batch fails, and so do its retries
        fake.failing_batches.extend([1, 2, 3]);
        let library = Arc::new(fake);
        let committer = BatchCommitter::new(library.clone(), RetryPolicy::immediate(3), 2);

        let result = committer.commit(Some(&album()), &tokens(5)).await;

        assert_eq!(result.batches_committed, 2);
        assert_eq!(result.batches_failed, 1);
        assert_eq!(result.succeeded(), 3);
        let failed: Vec<&str> = result
            .items
            .iter()
            .filter(|i| !i.is_success())
            .map(|i| i.file_name.as_str())
            .collect();
        assert_eq!(failed, vec!["IMG_3.jpg", "IMG_4.jpg"]);
    }

    #[tokio::test]
    async fn test_per_item_failure() {
        let mut fake = FakeLibrary::new();
        fake.rejected_items.insert("IMG_2.jpg".to_string());
        let library = Arc::new(fake);
        let committer = BatchCommitter::new(library, RetryPolicy::immediate(1), 50);

        let result = committer.commit(Some(&album()), &tokens(3)).await;

        assert_eq!(result.succeeded(), 2);
        assert!(matches!(
            &result.items[1].status,
            ItemStatus::Failed { reason } if reason.contains("IMG_2.jpg")
        ));
    }

    #[tokio::test]
    async fn test_loose_items_have_no_album() {
        let library = Arc::new(FakeLibrary::new());
        let committer = BatchCommitter::new(library.clone(), RetryPolicy::immediate(1), 50);

        committer.commit(None, &tokens(2)).await;

        let batches = library.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].0, None);
    }

    #[tokio::test]
    async fn test_cancelled_before_commit() {
        let library = Arc::new(FakeLibrary::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let committer = BatchCommitter::new(library.clone(), RetryPolicy::immediate(1), 50)
            .with_cancellation(cancel);

        let result = committer.commit(Some(&album()), &tokens(3)).await;

        assert_eq!(result.failed(), 3);
        assert_eq!(result.batches_skipped, 1);
        assert_eq!(library.remote_calls(), 0);
    }

    #[test]
    fn test_batch_size_is_clamped() {
        let library = Arc::new(FakeLibrary::new());
        assert_eq!(BatchCommitter::new(library.clone(), RetryPolicy::default(), 500).batch_size(), 50);
        assert_eq!(BatchCommitter::new(library, RetryPolicy::default(), 0).batch_size(), 1);
    }
}
