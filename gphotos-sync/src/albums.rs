//! Album resolution: reuse an existing remote album or create one, once per name

use std::collections::HashMap;
use std::sync::Arc;

use gphotos_core::api::{AlbumListParams, PhotoLibrary, RemoteAlbum, RetryPolicy};
use gphotos_core::AlbumMatch;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, instrument};

use crate::error::{Result, SyncError};

/// Albums requested per listing page
const ALBUM_PAGE_SIZE: u32 = 50;

/// A remote album resolved for this run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    /// Folder name the album was resolved for
    pub name: String,
    /// Remote album id
    pub id: String,
    /// Created during this run rather than reused
    pub created: bool,
}

/// Options controlling how existing albums are matched
#[derive(Debug, Clone, Copy)]
pub struct ResolverOptions {
    pub matching: AlbumMatch,
    pub app_created_only: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            matching: AlbumMatch::Exact,
            app_created_only: true,
        }
    }
}

/// Maps folder names to remote albums with a run-scoped cache.
///
/// Each name owns a `OnceCell`, so concurrent first requests for the same name
/// share a single listing/creation and never produce duplicate albums. A failed
/// resolution leaves the cell empty and the next request tries again.
pub struct AlbumResolver {
    library: Arc<dyn PhotoLibrary>,
    retry: RetryPolicy,
    options: ResolverOptions,
    cache: Mutex<HashMap<String, Arc<OnceCell<Album>>>>,
}

impl AlbumResolver {
    pub fn new(library: Arc<dyn PhotoLibrary>, retry: RetryPolicy, options: ResolverOptions) -> Self {
        Self {
            library,
            retry,
            options,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve `name` to an album, hitting the service only on the first
    /// successful request for that exact name.
    pub async fn resolve(&self, name: &str) -> Result<Album> {
        let cell = {
            let mut cache = self.cache.lock().await;
            cache
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        if let Some(album) = cell.get() {
            debug!(album = %name, "Album resolved from cache");
            return Ok(album.clone());
        }

        let album = cell
            .get_or_try_init(|| self.find_or_create(name))
            .await
            .map_err(|e| SyncError::remote_service(name, e))?;
        Ok(album.clone())
    }

    /// Every album resolved so far, in no particular order
    pub async fn resolved_albums(&self) -> Vec<Album> {
        let cache = self.cache.lock().await;
        cache.values().filter_map(|cell| cell.get().cloned()).collect()
    }

    #[instrument(skip(self))]
    async fn find_or_create(&self, name: &str) -> gphotos_core::api::Result<Album> {
        if let Some(existing) = self.find_existing(name).await? {
            info!(album = %name, id = %existing.id, "Uploading into existing album");
            return Ok(Album {
                name: name.to_string(),
                id: existing.id,
                created: false,
            });
        }

        let created = self
            .retry
            .run("create album", || self.library.create_album(name))
            .await?;
        info!(album = %name, id = %created.id, "Uploading into new album");

        Ok(Album {
            name: name.to_string(),
            id: created.id,
            created: true,
        })
    }

    /// First album in listing order whose title matches
    async fn find_existing(&self, name: &str) -> gphotos_core::api::Result<Option<RemoteAlbum>> {
        let mut page_token: Option<String> = None;

        loop {
            let mut params = AlbumListParams::new()
                .page_size(ALBUM_PAGE_SIZE)
                .app_created_only(self.options.app_created_only);
            if let Some(token) = &page_token {
                params = params.page_token(token.clone());
            }

            let page = self
                .retry
                .run("list albums", || self.library.list_albums(params.clone()))
                .await?;
            debug!(albums = page.albums.len(), "Fetched album page");

            if let Some(found) = page
                .albums
                .into_iter()
                .find(|album| self.options.matching.matches(&album.title, name))
            {
                return Ok(Some(found));
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(None),
            }
        }
    }
}
