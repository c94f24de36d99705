use super::error::Result;
use super::types::{AlbumListParams, AlbumPage, BatchCreateResponse, NewMediaItem, RemoteAlbum};
use async_trait::async_trait;
use bytes::Bytes;

/// Remote operations the upload pipeline needs from the photo library.
///
/// Every method performs exactly one request; retrying is left to the caller.
#[async_trait]
pub trait PhotoLibrary: Send + Sync {
    /// List one page of albums
    async fn list_albums(&self, params: AlbumListParams) -> Result<AlbumPage>;

    /// Create an album with the given title
    async fn create_album(&self, title: &str) -> Result<RemoteAlbum>;

    /// Stage raw bytes and return the upload token. `Bytes` clones share one
    /// buffer, so retries do not copy the file.
    async fn upload_bytes(&self, file_name: &str, mime_type: &str, bytes: Bytes) -> Result<String>;

    /// Attach staged items to an album, or to the library when `album_id` is `None`
    async fn batch_create(
        &self,
        album_id: Option<&str>,
        items: &[NewMediaItem],
    ) -> Result<BatchCreateResponse>;
}
