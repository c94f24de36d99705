//! Bearer credential sources.
//!
//! Token acquisition and refresh belong to the OAuth flow that runs outside this
//! crate. The client only asks a [`CredentialProvider`] for a bearer token before
//! each request.

use super::error::{PhotosError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supplies a valid bearer token for each outgoing request
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String>;
}

/// A fixed access token, e.g. from `GPHOTOS_ACCESS_TOKEN`
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticToken").field("token", &"<redacted>").finish()
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn bearer_token(&self) -> Result<String> {
        if self.token.trim().is_empty() {
            return Err(PhotosError::Credentials("access token is empty".to_string()));
        }
        Ok(self.token.clone())
    }
}

#[derive(Debug, Deserialize)]
struct AuthorizedUser {
    token: Option<String>,
}

/// Reads the `token` field of an authorized-user JSON file.
///
/// The file is re-read on every call so a refresher process that rewrites it is
/// picked up without restarting the upload.
#[derive(Debug, Clone)]
pub struct AuthFileCredentials {
    path: PathBuf,
}

impl AuthFileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialProvider for AuthFileCredentials {
    async fn bearer_token(&self) -> Result<String> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            PhotosError::Credentials(format!(
                "Failed to read auth file '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        let user: AuthorizedUser = serde_json::from_str(&content).map_err(|e| {
            PhotosError::Credentials(format!(
                "Auth file '{}' has an incorrect format: {}",
                self.path.display(),
                e
            ))
        })?;

        match user.token {
            Some(token) if !token.is_empty() => {
                debug!(path = %self.path.display(), "Loaded bearer token from auth file");
                Ok(token)
            }
            _ => Err(PhotosError::Credentials(format!(
                "Auth file '{}' does not contain a token",
                self.path.display()
            ))),
        }
    }
}
