//! Mock media library for testing without a real host library
//!
//! Items are registered with a scripted resolution behavior and, where they
//! resolve, backed by real files written under a caller-provided root so the
//! engine copies genuine bytes. Deletion calls are recorded instead of
//! performed, and can be made to fail.

use crate::core::error::LibraryError;
use crate::library::{
    FileSystem, MediaDeleter, MediaItemHandle, MediaSource, ResolveOptions, StdFileSystem,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How a mock item answers a resolution request
#[derive(Debug, Clone)]
pub enum MockResolution {
    /// Resolve to this path
    Path(PathBuf),
    /// Answer with no location
    Unavailable,
    /// Resolve to this path after a delay
    Delayed(Duration, PathBuf),
}

/// Scriptable media library
#[derive(Clone)]
pub struct MockMediaLibrary {
    root: PathBuf,
    items: Arc<Mutex<HashMap<String, MockResolution>>>,
    resolve_calls: Arc<Mutex<Vec<(String, ResolveOptions)>>>,
    deletion_calls: Arc<Mutex<Vec<Vec<String>>>>,
    fail_deletion: Arc<Mutex<bool>>,
    journal: Arc<Mutex<Vec<String>>>,
}

impl MockMediaLibrary {
    /// Create a library whose backing files live under `root`
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            items: Arc::new(Mutex::new(HashMap::new())),
            resolve_calls: Arc::new(Mutex::new(Vec::new())),
            deletion_calls: Arc::new(Mutex::new(Vec::new())),
            fail_deletion: Arc::new(Mutex::new(false)),
            journal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a photo backed by `root/<id>/<file_name>`
    pub fn add_photo(&self, id: &str, file_name: &str, content: &[u8]) -> MediaItemHandle {
        let path = self.write_backing_file(id, file_name, content);
        self.register(id, MockResolution::Path(path));
        MediaItemHandle::photo(id)
    }

    /// Add a video backed by `root/<id>/<file_name>`
    pub fn add_video(
        &self,
        id: &str,
        file_name: &str,
        content: &[u8],
        duration: Duration,
    ) -> MediaItemHandle {
        let path = self.write_backing_file(id, file_name, content);
        self.register(id, MockResolution::Path(path));
        MediaItemHandle::video(id, duration)
    }

    /// Add a photo that never resolves
    pub fn add_unresolvable(&self, id: &str) -> MediaItemHandle {
        self.register(id, MockResolution::Unavailable);
        MediaItemHandle::photo(id)
    }

    /// Add a photo that resolves only after `delay`
    pub fn add_slow(
        &self,
        id: &str,
        file_name: &str,
        content: &[u8],
        delay: Duration,
    ) -> MediaItemHandle {
        let path = self.write_backing_file(id, file_name, content);
        self.register(id, MockResolution::Delayed(delay, path));
        MediaItemHandle::photo(id)
    }

    /// Add a photo that resolves to a file which no longer exists
    pub fn add_vanished(&self, id: &str, file_name: &str) -> MediaItemHandle {
        let path = self.root.join(id).join(file_name);
        self.register(id, MockResolution::Path(path));
        MediaItemHandle::photo(id)
    }

    /// Add a photo that resolves to a directory, so reading it fails
    pub fn add_directory(&self, id: &str, dir_name: &str) -> MediaItemHandle {
        let path = self.root.join(id).join(dir_name);
        fs::create_dir_all(&path).expect("create mock item directory");
        self.register(id, MockResolution::Path(path));
        MediaItemHandle::photo(id)
    }

    /// Make every subsequent deletion batch fail
    pub fn fail_deletions(&self) {
        *self.fail_deletion.lock().unwrap() = true;
    }

    /// Ids passed to each `delete_items` call, in call order
    pub fn deletion_calls(&self) -> Vec<Vec<String>> {
        self.deletion_calls.lock().unwrap().clone()
    }

    /// Every resolution request received, in order
    pub fn resolve_calls(&self) -> Vec<(String, ResolveOptions)> {
        self.resolve_calls.lock().unwrap().clone()
    }

    /// Shared journal that tests may append their own markers to
    pub fn journal(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.journal)
    }

    fn register(&self, id: &str, resolution: MockResolution) {
        self.items
            .lock()
            .unwrap()
            .insert(id.to_string(), resolution);
    }

    fn write_backing_file(&self, id: &str, file_name: &str, content: &[u8]) -> PathBuf {
        let dir = self.root.join(id);
        fs::create_dir_all(&dir).expect("create mock item folder");
        let path = dir.join(file_name);
        fs::write(&path, content).expect("write mock item file");
        path
    }
}

#[async_trait]
impl MediaSource for MockMediaLibrary {
    async fn resolve_original(
        &self,
        item: &MediaItemHandle,
        options: ResolveOptions,
    ) -> Option<PathBuf> {
        self.resolve_calls
            .lock()
            .unwrap()
            .push((item.id().to_string(), options));

        let resolution = self.items.lock().unwrap().get(item.id()).cloned();
        match resolution? {
            MockResolution::Path(path) => Some(path),
            MockResolution::Unavailable => None,
            MockResolution::Delayed(delay, path) => {
                tokio::time::sleep(delay).await;
                Some(path)
            }
        }
    }
}

#[async_trait]
impl MediaDeleter for MockMediaLibrary {
    async fn delete_items(&self, items: &[MediaItemHandle]) -> Result<(), LibraryError> {
        let ids: Vec<String> = items.iter().map(|i| i.id().to_string()).collect();
        self.journal
            .lock()
            .unwrap()
            .push(format!("delete:{}", ids.join(",")));
        self.deletion_calls.lock().unwrap().push(ids);

        if *self.fail_deletion.lock().unwrap() {
            return Err(LibraryError::Deletion {
                failed: items.len(),
                total: items.len(),
                message: "The operation couldn't be completed".to_string(),
            });
        }
        Ok(())
    }
}

/// [`FileSystem`] that fails copies of chosen file names
#[derive(Debug, Clone)]
pub struct FaultyFileSystem {
    failing_names: HashSet<String>,
    kind: io::ErrorKind,
}

impl FaultyFileSystem {
    /// Fail every copy whose destination file name starts with one of `names`
    pub fn failing_on(names: &[&str], kind: io::ErrorKind) -> Self {
        Self {
            failing_names: names.iter().map(|n| n.to_string()).collect(),
            kind,
        }
    }
}

impl FileSystem for FaultyFileSystem {
    fn exists(&self, path: &Path) -> bool {
        StdFileSystem.exists(path)
    }

    fn copy(&self, src: &Path, dst: &Path) -> io::Result<u64> {
        let name = dst
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing_names.iter().any(|f| name.starts_with(f.as_str())) {
            return Err(io::Error::new(self.kind, "No space left on device"));
        }
        StdFileSystem.copy(src, dst)
    }
}
