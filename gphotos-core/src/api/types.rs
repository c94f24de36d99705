use serde::{Deserialize, Serialize};

/// Album resource as returned by the `albums` endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAlbum {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_writeable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_items_count: Option<String>,
}

/// One page of an album listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumPage {
    #[serde(default)]
    pub albums: Vec<RemoteAlbum>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Query parameters for album listing requests
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
    pub exclude_non_app_created_data: bool,
}

impl AlbumListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn page_token(mut self, token: impl Into<String>) -> Self {
        self.page_token = Some(token.into());
        self
    }

    pub fn app_created_only(mut self, app_created_only: bool) -> Self {
        self.exclude_non_app_created_data = app_created_only;
        self
    }
}

/// Body of `POST /albums`
#[derive(Debug, Serialize)]
pub struct CreateAlbumRequest {
    pub album: NewAlbum,
}

#[derive(Debug, Serialize)]
pub struct NewAlbum {
    pub title: String,
}

/// A staged upload waiting to be attached to the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMediaItem {
    pub description: String,
    pub simple_media_item: SimpleMediaItem,
}

impl NewMediaItem {
    pub fn new(upload_token: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            description: String::new(),
            simple_media_item: SimpleMediaItem {
                upload_token: upload_token.into(),
                file_name: Some(file_name.into()),
            },
        }
    }

    pub fn upload_token(&self) -> &str {
        &self.simple_media_item.upload_token
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleMediaItem {
    pub upload_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// Body of `POST /mediaItems:batchCreate`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_id: Option<&'a str>,
    pub new_media_items: &'a [NewMediaItem],
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateResponse {
    #[serde(default)]
    pub new_media_item_results: Vec<NewMediaItemResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMediaItemResult {
    #[serde(default)]
    pub upload_token: Option<String>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub media_item: Option<MediaItem>,
}

impl NewMediaItemResult {
    /// Non-zero status codes mark a per-item failure
    pub fn is_success(&self) -> bool {
        match &self.status {
            Some(status) => status.code.unwrap_or(0) <= 0,
            None => self.media_item.is_some(),
        }
    }

    pub fn failure_message(&self) -> String {
        self.status
            .as_ref()
            .and_then(|s| s.message.clone())
            .unwrap_or_else(|| "no status returned for item".to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub product_url: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Error envelope used by Google APIs
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}
