//! Core library for the Google Photos uploader
//!
//! This crate provides the remote side of the upload pipeline: the Photos
//! Library API client, bearer credential sources, the bounded retry policy and
//! the upload configuration.

pub mod api;
pub mod config;

pub use api::{
    AuthFileCredentials, CredentialProvider, PhotoLibrary, PhotosClient, PhotosClientBuilder,
    PhotosError, RetryPolicy, StaticToken,
};
pub use config::{AlbumMatch, ConfigError, UploadConfig, MAX_BATCH_SIZE};
