use super::{auth::CredentialProvider, error::*, library::PhotoLibrary, types::*};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{ClientBuilder, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::{sync::Arc, time::Duration};
use tracing::{debug, instrument};

/// Default Photos Library API endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://photoslibrary.googleapis.com/v1";

/// HTTP client for the Google Photos Library API
pub struct PhotosClient {
    /// HTTP client for making requests
    http_client: reqwest::Client,

    /// Base URL of the API, without a trailing slash
    base_url: String,

    /// Bearer token source, consulted before every request
    credentials: Arc<dyn CredentialProvider>,
}

impl std::fmt::Debug for PhotosClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotosClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl PhotosClient {
    /// Create a new client with default timeouts
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        PhotosClientBuilder::new(base_url, credentials).build()
    }

    /// Create a new client around an existing HTTP client
    pub fn with_client(
        base_url: impl Into<String>,
        http_client: reqwest::Client,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            http_client,
            base_url,
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.credentials.bearer_token().await?;
        Ok(request.bearer_auth(token))
    }

    async fn handle_json<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        if response.status().is_success() {
            let text = response.text().await?;
            debug!("Server response: {}", text);
            Ok(serde_json::from_str(&text)?)
        } else {
            Err(self.parse_error_response(response).await)
        }
    }

    async fn parse_error_response(&self, response: reqwest::Response) -> PhotosError {
        let status = response.status();

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let error_text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&error_text)
            .map(|e| e.error.message)
            .unwrap_or(error_text);

        match status {
            StatusCode::UNAUTHORIZED => PhotosError::Authentication(message),
            StatusCode::FORBIDDEN => PhotosError::Authorization(message),
            StatusCode::NOT_FOUND => PhotosError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => PhotosError::RateLimit { retry_after },
            status if status.is_client_error() => PhotosError::InvalidRequest(message),
            status => PhotosError::Server {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl PhotoLibrary for PhotosClient {
    #[instrument(skip(self, params), fields(page_token = ?params.page_token))]
    async fn list_albums(&self, params: AlbumListParams) -> Result<AlbumPage> {
        let mut url = self.endpoint("albums");
        url.push('?');
        url.push_str(&serde_urlencoded::to_string(&params).unwrap_or_default());

        let request = self.authorized(self.http_client.get(&url)).await?;
        let response = request.send().await?;
        self.handle_json(response).await
    }

    #[instrument(skip(self))]
    async fn create_album(&self, title: &str) -> Result<RemoteAlbum> {
        let body = CreateAlbumRequest {
            album: NewAlbum {
                title: title.to_string(),
            },
        };

        let request = self
            .authorized(self.http_client.post(self.endpoint("albums")).json(&body))
            .await?;
        let response = request.send().await?;
        let album: RemoteAlbum = self.handle_json(response).await?;

        if album.id.is_empty() {
            return Err(PhotosError::UnexpectedResponse(format!(
                "album '{}' was created without an id",
                title
            )));
        }
        Ok(album)
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload_bytes(&self, file_name: &str, mime_type: &str, bytes: Bytes) -> Result<String> {
        let request = self
            .http_client
            .post(self.endpoint("uploads"))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .header("X-Goog-Upload-Content-Type", mime_type)
            .header("X-Goog-Upload-Protocol", "raw")
            .header("X-Goog-Upload-File-Name", file_name)
            .body(bytes);

        let response = self.authorized(request).await?.send().await?;

        if !response.status().is_success() {
            return Err(self.parse_error_response(response).await);
        }

        let token = response.text().await?;
        if token.trim().is_empty() {
            return Err(PhotosError::UnexpectedResponse(format!(
                "empty upload token for '{}'",
                file_name
            )));
        }
        Ok(token.trim().to_string())
    }

    #[instrument(skip(self, items), fields(items = items.len()))]
    async fn batch_create(
        &self,
        album_id: Option<&str>,
        items: &[NewMediaItem],
    ) -> Result<BatchCreateResponse> {
        let body = BatchCreateRequest {
            album_id,
            new_media_items: items,
        };

        let request = self
            .authorized(
                self.http_client
                    .post(self.endpoint("mediaItems:batchCreate"))
                    .json(&body),
            )
            .await?;
        let response = request.send().await?;
        self.handle_json(response).await
    }
}

// Builder pattern for client configuration
pub struct PhotosClientBuilder {
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl PhotosClientBuilder {
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            base_url: base_url.into(),
            credentials,
            timeout: None,
            connect_timeout: None,
            user_agent: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self) -> Result<PhotosClient> {
        url::Url::parse(&self.base_url)?;

        let client_builder = ClientBuilder::new()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(120)))
            .connect_timeout(self.connect_timeout.unwrap_or(Duration::from_secs(10)))
            .user_agent(
                self.user_agent
                    .unwrap_or_else(|| concat!("gphotos-upload/", env!("CARGO_PKG_VERSION")).to_string()),
            );

        let http_client = client_builder.build().map_err(PhotosError::Network)?;

        Ok(PhotosClient::with_client(
            self.base_url,
            http_client,
            self.credentials,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::StaticToken;

    fn credentials() -> Arc<dyn CredentialProvider> {
        Arc::new(StaticToken::new("token"))
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = PhotosClient::new(DEFAULT_API_BASE_URL, credentials());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_client_builder() {
        let client = PhotosClientBuilder::new("http://localhost:8080/v1/", credentials())
            .timeout(Duration::from_secs(60))
            .user_agent("test-client/1.0")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/v1");
        assert_eq!(client.endpoint("uploads"), "http://localhost:8080/v1/uploads");
    }

    #[test]
    fn test_invalid_base_url() {
        let client = PhotosClientBuilder::new("not a url", credentials()).build();
        assert!(matches!(client, Err(PhotosError::InvalidUrl(_))));
    }
}
