//! Staging of raw file bytes, one request per file

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use gphotos_core::api::{NewMediaItem, PhotoLibrary, RetryPolicy};
use tracing::{error, info, instrument};

use crate::error::{Result, SyncError};
use crate::scanner::MediaFile;

/// Token returned by the staging endpoint, valid until committed
#[derive(Debug, Clone)]
pub struct UploadToken {
    pub token: String,
    pub file: MediaFile,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadToken {
    pub fn to_media_item(&self) -> NewMediaItem {
        NewMediaItem::new(self.token.clone(), self.file.file_name.clone())
    }
}

/// Uploads file contents and hands back upload tokens
pub struct MediaUploader {
    library: Arc<dyn PhotoLibrary>,
    retry: RetryPolicy,
}

impl MediaUploader {
    pub fn new(library: Arc<dyn PhotoLibrary>, retry: RetryPolicy) -> Self {
        Self { library, retry }
    }

    /// Stage one file. Transient failures are retried under the policy; any
    /// final failure is an [`SyncError::Upload`] for this file only.
    #[instrument(skip(self, file), fields(path = %file.path.display()))]
    pub async fn stage(&self, file: &MediaFile) -> Result<UploadToken> {
        let bytes = tokio::fs::read(&file.path)
            .await
            .map(Bytes::from)
            .map_err(|e| {
                error!("Could not read file: {}", e);
                SyncError::upload_error(&file.path, format!("Could not read file: {}", e))
            })?;

        info!(size = bytes.len(), "Uploading photo");

        let token = self
            .retry
            .run("stage upload", || {
                self.library
                    .upload_bytes(&file.file_name, file.content_type(), bytes.clone())
            })
            .await
            .map_err(|e| {
                error!("Could not upload '{}': {}", file.file_name, e);
                SyncError::upload_error(&file.path, e)
            })?;

        Ok(UploadToken {
            token,
            file: file.clone(),
            uploaded_at: Utc::now(),
        })
    }
}
