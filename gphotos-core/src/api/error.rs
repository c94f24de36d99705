use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhotosError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Credential error: {0}")]
    Credentials(String),

    #[error("Rate limited: {retry_after:?}")]
    RateLimit { retry_after: Option<u64> },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl PhotosError {
    pub fn is_retryable(&self) -> bool {
        match self {
            PhotosError::Network(e) => !e.is_builder() && !e.is_decode(),
            PhotosError::Server { status, .. } if *status >= 500 => true,
            PhotosError::RateLimit { .. } => true,
            _ => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            PhotosError::RateLimit { retry_after } => retry_after.map(Duration::from_secs),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PhotosError>;
