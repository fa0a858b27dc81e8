//! Media library abstraction
//!
//! The transfer engine never talks to a concrete library. It consumes three
//! capabilities, each a trait so that real libraries and mock libraries can
//! be used interchangeably:
//!
//! - [`MediaSource`] - resolves an item to a readable file
//! - [`MediaDeleter`] - best-effort batch removal of items
//! - [`FileSystem`] - synchronous `exists` / `copy` primitives
//!
//! # Submodules
//!
//! - `folder` - a media library backed by a directory tree

pub mod folder;

pub use folder::{FolderLibrary, ScanFilter};

use crate::core::error::LibraryError;
use async_trait::async_trait;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Kind of media an item holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn is_video(&self) -> bool {
        matches!(self, MediaKind::Video)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Opaque reference to a library-managed media item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MediaItemHandle {
    id: String,
    kind: MediaKind,
    duration: Duration,
}

impl MediaItemHandle {
    pub fn photo(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: MediaKind::Photo,
            duration: Duration::ZERO,
        }
    }

    pub fn video(id: impl Into<String>, duration: Duration) -> Self {
        Self {
            id: id.into(),
            kind: MediaKind::Video,
            duration,
        }
    }

    /// Stable identifier, unique within its library
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Playback length; zero for photos
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// Which representation of an item to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// Unedited original video at the highest available quality
    OriginalVideo,
    /// Full-size image, including any edits
    FullSizeImage,
}

/// Options passed to [`MediaSource::resolve_original`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    pub representation: Representation,
    /// Allow fetching originals that are not stored locally
    pub network_access_allowed: bool,
    /// Prefer the highest-quality delivery over a fast, degraded one
    pub high_quality_delivery: bool,
    /// Accept edits in any adjustment format rather than only known ones
    pub accept_adjustment_data: bool,
}

impl ResolveOptions {
    /// Best-quality original for the item's kind
    pub fn for_item(item: &MediaItemHandle) -> Self {
        match item.kind() {
            MediaKind::Video => Self {
                representation: Representation::OriginalVideo,
                network_access_allowed: true,
                high_quality_delivery: true,
                accept_adjustment_data: false,
            },
            MediaKind::Photo => Self {
                representation: Representation::FullSizeImage,
                network_access_allowed: true,
                high_quality_delivery: false,
                accept_adjustment_data: true,
            },
        }
    }
}

/// Resolves media items to readable file locations
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Yield a path to the item's original bytes, or `None` if it cannot be
    /// resolved. Callers bound the wait themselves.
    async fn resolve_original(
        &self,
        item: &MediaItemHandle,
        options: ResolveOptions,
    ) -> Option<PathBuf>;
}

/// Removes items from the host library
#[async_trait]
pub trait MediaDeleter: Send + Sync {
    /// Delete all `items` as one batch
    async fn delete_items(&self, items: &[MediaItemHandle]) -> Result<(), LibraryError>;
}

/// Synchronous file primitives used by the engine
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Copy `src` into a new file at `dst`, returning the bytes written.
    /// Must fail rather than replace an existing `dst`.
    fn copy(&self, src: &Path, dst: &Path) -> io::Result<u64>;
}

/// [`FileSystem`] over `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn copy(&self, src: &Path, dst: &Path) -> io::Result<u64> {
        let mut input = File::open(src)?;
        let mut output = OpenOptions::new().write(true).create_new(true).open(dst)?;
        let result = io::copy(&mut input, &mut output).and_then(|bytes| {
            output.sync_all()?;
            Ok(bytes)
        });

        // Only this call created `dst`, so a partial file is ours to remove
        if result.is_err() {
            drop(output);
            if let Err(e) = std::fs::remove_file(dst) {
                warn!("Failed to remove partial copy {}: {}", dst.display(), e);
            }
        }
        result
    }
}
