//! Directory scanning: builds the album tree using walkdir

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, SyncError};
use crate::media;
use crate::natural::{natural_cmp, NaturalKey};

/// Options for directory scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Maximum album nesting depth below the root (None for unlimited)
    pub max_depth: Option<usize>,
    /// Include hidden files and directories
    pub include_hidden: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            include_hidden: false,
        }
    }
}

/// A single image or video selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File name, sent to the service with the upload
    pub file_name: String,
    /// File size in bytes
    pub size: u64,
    sort_key: NaturalKey,
}

impl MediaFile {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let sort_key = NaturalKey::new(&file_name);

        Self {
            path,
            file_name,
            size,
            sort_key,
        }
    }

    pub fn sort_key(&self) -> &NaturalKey {
        &self.sort_key
    }

    /// Content-type hint derived from the extension
    pub fn content_type(&self) -> &'static str {
        media::content_type(&self.path)
    }
}

/// A folder: the root of the tree or an album
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    pub path: PathBuf,
    /// Folder name, used as the album title
    pub name: String,
    /// Sub-folders, each an album of its own
    pub albums: Vec<DirectoryNode>,
    pub files: Vec<MediaFile>,
}

impl DirectoryNode {
    fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        Self {
            path,
            name,
            albums: Vec::new(),
            files: Vec::new(),
        }
    }

    /// No media files and no sub-albums
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.albums.is_empty()
    }

    /// Media files in this folder and all folders below it
    pub fn total_files(&self) -> usize {
        self.files.len() + self.albums.iter().map(DirectoryNode::total_files).sum::<usize>()
    }

    /// Folders below this one, in depth-first natural order
    pub fn descendants(&self) -> Vec<&DirectoryNode> {
        let mut out = Vec::new();
        for album in &self.albums {
            out.push(album);
            out.extend(album.descendants());
        }
        out
    }
}

/// Read-only walker that classifies entries as albums or media files
pub struct PathScanner {
    options: ScanOptions,
}

impl Default for PathScanner {
    fn default() -> Self {
        Self::new(ScanOptions::default())
    }
}

impl PathScanner {
    /// Create a new scanner with options
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    /// Scan a directory tree. The returned root maps to no album; its
    /// sub-folders are the top-level albums.
    pub fn scan<P: AsRef<Path>>(&self, root_path: P) -> Result<DirectoryNode> {
        let root_path = root_path.as_ref();

        if !root_path.exists() {
            return Err(SyncError::invalid_input(root_path, "Directory does not exist"));
        }

        if !root_path.is_dir() {
            return Err(SyncError::invalid_input(root_path, "Path is not a directory"));
        }

        let root_path = root_path.canonicalize().map_err(|e| {
            SyncError::invalid_input(root_path, format!("Failed to resolve path: {}", e))
        })?;

        std::fs::read_dir(&root_path).map_err(|e| {
            SyncError::invalid_input(&root_path, format!("Directory is not readable: {}", e))
        })?;

        let root = self.scan_directory(root_path, 0);
        debug!(
            root = %root.path.display(),
            albums = root.descendants().len(),
            files = root.total_files(),
            "Scan completed"
        );
        Ok(root)
    }

    fn scan_directory(&self, path: PathBuf, depth: usize) -> DirectoryNode {
        let mut node = DirectoryNode::new(path);

        let walker = WalkDir::new(&node.path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(path = %node.path.display(), "Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            let file_type = entry.file_type();

            // Skip hidden files if not included
            if !self.options.include_hidden && is_hidden(path) {
                continue;
            }

            if file_type.is_symlink() {
                debug!(path = %path.display(), "Skipping symbolic link");
            } else if file_type.is_dir() {
                if self.options.max_depth.is_some_and(|max| depth >= max) {
                    debug!(path = %path.display(), "Skipping folder below maximum depth");
                    continue;
                }
                node.albums.push(self.scan_directory(path.to_path_buf(), depth + 1));
            } else if file_type.is_file() {
                if media::is_media_file(path) {
                    let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                    node.files.push(MediaFile::new(path, size));
                } else {
                    debug!(path = %path.display(), "Skipping non-media file");
                }
            } else {
                debug!(path = %path.display(), "Skipping special file");
            }
        }

        node.albums.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        sort_files(&mut node.files);
        node
    }

    /// Build the file list for single-album mode: every path must be an
    /// existing regular file; no extension filtering, natural order applied.
    pub fn collect_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<MediaFile>> {
        if paths.is_empty() {
            return Err(SyncError::invalid_input("", "No photos specified"));
        }

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let metadata = std::fs::metadata(path).map_err(|e| {
                SyncError::invalid_input(path, format!("Could not read file: {}", e))
            })?;
            if !metadata.is_file() {
                return Err(SyncError::invalid_input(path, "Not a regular file"));
            }
            let absolute = path.canonicalize().map_err(|e| {
                SyncError::invalid_input(path, format!("Failed to resolve path: {}", e))
            })?;
            files.push(MediaFile::new(absolute, metadata.len()));
        }

        sort_files(&mut files);
        Ok(files)
    }
}

fn sort_files(files: &mut [MediaFile]) {
    files.sort_by(|a, b| {
        a.sort_key
            .cmp(&b.sort_key)
            .then_with(|| natural_cmp(&a.file_name, &b.file_name))
            .then_with(|| a.path.cmp(&b.path))
    });
}

/// Check if a path represents a hidden file or directory
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
