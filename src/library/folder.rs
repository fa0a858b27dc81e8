//! Folder-backed media library
//!
//! Treats a directory tree as a media library: every file with a known photo
//! or video extension is an item, identified by its path relative to the
//! library root (always `/`-separated). Resolution yields the file itself and
//! deletion removes it from disk.

use super::{MediaDeleter, MediaItemHandle, MediaKind, MediaSource, ResolveOptions};
use crate::core::error::LibraryError;
use async_trait::async_trait;
use log::{debug, trace, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// File extensions treated as photos
const PHOTO_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "heic", "heif", "gif", "webp", "raw", "dng", "tiff", "tif", "bmp",
];

/// File extensions treated as videos
const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4", "m4v", "avi", "3gp"];

/// Classify a file name by extension
pub fn media_kind_for(name: &str) -> Option<MediaKind> {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if PHOTO_EXTENSIONS.contains(&extension.as_str()) {
        Some(MediaKind::Photo)
    } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Which items a scan returns
#[derive(Debug, Clone)]
pub struct ScanFilter {
    pub include_photos: bool,
    pub include_videos: bool,
    /// Descend into subfolders
    pub recursive: bool,
}

impl Default for ScanFilter {
    fn default() -> Self {
        Self {
            include_photos: true,
            include_videos: true,
            recursive: true,
        }
    }
}

impl ScanFilter {
    fn accepts(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Photo => self.include_photos,
            MediaKind::Video => self.include_videos,
        }
    }
}

/// Media library rooted at a directory
#[derive(Debug, Clone)]
pub struct FolderLibrary {
    root: PathBuf,
}

impl FolderLibrary {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Enumerate media items in a stable (name-sorted) order
    pub fn scan(&self, filter: &ScanFilter) -> Result<Vec<MediaItemHandle>, LibraryError> {
        if !self.root.is_dir() {
            return Err(LibraryError::Io(format!(
                "Library folder '{}' does not exist or is not a directory",
                self.root.display()
            )));
        }

        let max_depth = if filter.recursive { usize::MAX } else { 1 };
        let mut items = Vec::new();

        for entry in WalkDir::new(&self.root)
            .max_depth(max_depth)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Failed to read library entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            let Some(kind) = media_kind_for(&name) else {
                trace!("Ignoring non-media file: {}", entry.path().display());
                continue;
            };
            if !filter.accepts(kind) {
                continue;
            }

            let Some(id) = self.id_for(entry.path()) else {
                continue;
            };

            items.push(match kind {
                MediaKind::Photo => MediaItemHandle::photo(id),
                MediaKind::Video => MediaItemHandle::video(id, Duration::ZERO),
            });
        }

        debug!(
            "Found {} media item(s) in {}",
            items.len(),
            self.root.display()
        );
        Ok(items)
    }

    /// Absolute path for an item id
    pub fn path_for(&self, item: &MediaItemHandle) -> PathBuf {
        item.id()
            .split('/')
            .fold(self.root.clone(), |path, part| path.join(part))
    }

    fn id_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

#[async_trait]
impl MediaSource for FolderLibrary {
    async fn resolve_original(
        &self,
        item: &MediaItemHandle,
        _options: ResolveOptions,
    ) -> Option<PathBuf> {
        let path = self.path_for(item);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            Ok(_) => None,
            Err(e) => {
                debug!("Cannot resolve '{}': {}", item.id(), e);
                None
            }
        }
    }
}

#[async_trait]
impl MediaDeleter for FolderLibrary {
    async fn delete_items(&self, items: &[MediaItemHandle]) -> Result<(), LibraryError> {
        let mut failures = Vec::new();

        for item in items {
            let path = self.path_for(item);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                failures.push(format!("{}: {}", item.id(), e));
            } else {
                debug!("Deleted original: {}", path.display());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(LibraryError::Deletion {
                failed: failures.len(),
                total: items.len(),
                message: failures.join("; "),
            })
        }
    }
}
