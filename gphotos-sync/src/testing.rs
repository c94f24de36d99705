//! In-memory photo library used by the pipeline tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use gphotos_core::api::{
    AlbumListParams, AlbumPage, BatchCreateResponse, MediaItem, NewMediaItem, NewMediaItemResult,
    PhotoLibrary, PhotosError, RemoteAlbum, Result, Status,
};
use tokio_util::sync::CancellationToken;

/// Records every call and fails on demand
#[derive(Default)]
pub struct FakeLibrary {
    pub albums: Mutex<Vec<RemoteAlbum>>,
    pub page_size: usize,
    pub list_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    /// Album id (or `None` for loose items) and upload tokens of every batch
    pub batches: Mutex<Vec<(Option<String>, Vec<String>)>>,
    /// Album titles whose creation fails with a server error
    pub failing_creates: HashSet<String>,
    /// Listing always fails with a server error
    pub failing_list: bool,
    /// File names whose staging always fails with a server error
    pub failing_uploads: HashSet<String>,
    /// File names whose staging fails with a permanent client error
    pub rejected_uploads: HashSet<String>,
    /// File names the service refuses per item in batch create
    pub rejected_items: HashSet<String>,
    /// Zero-based batch-create calls that fail at transport level
    pub failing_batches: HashSet<usize>,
    pub upload_attempts: Mutex<HashMap<String, usize>>,
    /// Start address of the body passed to each staging call
    pub upload_buffers: Mutex<Vec<usize>>,
    /// Cancelled once the first staging call has been answered
    pub cancel_on_upload: Option<CancellationToken>,
    batch_calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl FakeLibrary {
    pub fn new() -> Self {
        Self {
            page_size: 2,
            ..Default::default()
        }
    }

    pub fn with_album(self, id: &str, title: &str) -> Self {
        self.albums.lock().unwrap().push(RemoteAlbum {
            id: id.to_string(),
            title: title.to_string(),
            product_url: None,
            is_writeable: Some(true),
            media_items_count: None,
        });
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(|(_, t)| t.len()).collect()
    }

    pub fn attempts_for(&self, file_name: &str) -> usize {
        self.upload_attempts
            .lock()
            .unwrap()
            .get(file_name)
            .copied()
            .unwrap_or(0)
    }

    pub fn remote_calls(&self) -> usize {
        self.list_calls() + self.create_calls() + self.upload_calls() + self.batch_calls.load(Ordering::SeqCst)
    }

    fn server_error() -> PhotosError {
        PhotosError::Server {
            status: 503,
            message: "backend unavailable".to_string(),
        }
    }
}

#[async_trait]
impl PhotoLibrary for FakeLibrary {
    async fn list_albums(&self, params: AlbumListParams) -> Result<AlbumPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if self.failing_list {
            return Err(Self::server_error());
        }

        let albums = self.albums.lock().unwrap().clone();
        let start: usize = params
            .page_token
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or(0);
        let end = (start + self.page_size.max(1)).min(albums.len());

        Ok(AlbumPage {
            albums: albums[start.min(end)..end].to_vec(),
            next_page_token: (end < albums.len()).then(|| end.to_string()),
        })
    }

    async fn create_album(&self, title: &str) -> Result<RemoteAlbum> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if self.failing_creates.contains(title) {
            return Err(Self::server_error());
        }

        let id = format!("album-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let album = RemoteAlbum {
            id,
            title: title.to_string(),
            product_url: None,
            is_writeable: Some(true),
            media_items_count: None,
        };
        self.albums.lock().unwrap().push(album.clone());
        Ok(album)
    }

    async fn upload_bytes(&self, file_name: &str, _mime_type: &str, bytes: Bytes) -> Result<String> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.upload_buffers.lock().unwrap().push(bytes.as_ptr() as usize);
        *self
            .upload_attempts
            .lock()
            .unwrap()
            .entry(file_name.to_string())
            .or_insert(0) += 1;
        tokio::task::yield_now().await;

        if let Some(cancel) = &self.cancel_on_upload {
            cancel.cancel();
        }
        if self.failing_uploads.contains(file_name) {
            return Err(Self::server_error());
        }
        if self.rejected_uploads.contains(file_name) {
            return Err(PhotosError::InvalidRequest("unsupported media".to_string()));
        }
        Ok(format!("token:{}", file_name))
    }

    async fn batch_create(
        &self,
        album_id: Option<&str>,
        items: &[NewMediaItem],
    ) -> Result<BatchCreateResponse> {
        let call = self.batch_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if self.failing_batches.contains(&call) {
            return Err(Self::server_error());
        }

        let tokens: Vec<String> = items.iter().map(|i| i.upload_token().to_string()).collect();
        self.batches
            .lock()
            .unwrap()
            .push((album_id.map(str::to_string), tokens));

        // Results deliberately come back reversed to exercise token matching
        let results = items
            .iter()
            .rev()
            .map(|item| {
                let file_name = item.simple_media_item.file_name.clone().unwrap_or_default();
                if self.rejected_items.contains(&file_name) {
                    NewMediaItemResult {
                        upload_token: Some(item.upload_token().to_string()),
                        status: Some(Status {
                            code: Some(3),
                            message: Some("Failed: There was an error while trying to create this media item.".to_string()),
                        }),
                        media_item: None,
                    }
                } else {
                    NewMediaItemResult {
                        upload_token: Some(item.upload_token().to_string()),
                        status: Some(Status {
                            code: None,
                            message: Some("Success".to_string()),
                        }),
                        media_item: Some(MediaItem {
                            id: format!("media:{}", file_name),
                            filename: Some(file_name),
                            product_url: None,
                            mime_type: None,
                        }),
                    }
                }
            })
            .collect();

        Ok(BatchCreateResponse {
            new_media_item_results: results,
        })
    }
}
