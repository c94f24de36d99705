//! Google Photos Library API client module
//!
//! This module wraps the REST endpoints the uploader needs (album listing and
//! creation, raw byte staging, batch media creation) behind the [`PhotoLibrary`]
//! trait, with bearer credentials supplied by a [`CredentialProvider`] and a
//! bounded [`RetryPolicy`] for transient failures.

pub mod auth;
pub mod client;
pub mod error;
pub mod library;
pub mod retry;
pub mod types;

// Re-export main types for convenience
pub use auth::{AuthFileCredentials, CredentialProvider, StaticToken};
pub use client::{PhotosClient, PhotosClientBuilder, DEFAULT_API_BASE_URL};
pub use error::{PhotosError, Result};
pub use library::PhotoLibrary;
pub use retry::RetryPolicy;
pub use types::*;
