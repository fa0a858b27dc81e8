//! Batch transfer engine
//!
//! Executes one [`TransferRequest`] at a time: each item is resolved to a
//! readable file, copied into the destination under a collision-free name,
//! optionally queued for deletion from the library, and reported as
//! fractional progress. A terminal completion is reported exactly once.
//!
//! Failure semantics:
//! - an item that cannot be resolved (no location, or the bounded wait
//!   elapses) is skipped and the request continues
//! - the first copy failure aborts the request; files already copied stay
//! - a failed deletion batch is logged and never turns success into failure
//!
//! Callbacks go through a [`Dispatcher`] so the caller chooses the context
//! they run on.

use crate::core::access::DestinationAccess;
use crate::core::error::{CopyError, ResolutionError, Result, TransferError};
use crate::core::naming;
use crate::dispatch::Dispatcher;
use crate::library::{FileSystem, MediaDeleter, MediaItemHandle, MediaSource, ResolveOptions};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Default bounded wait for resolving one item
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Completion detail reported when a request is cancelled
pub const CANCELLED_DETAIL: &str = "Transfer cancelled";

// =============================================================================
// Engine State
// =============================================================================

/// Lifecycle of the engine's current (or last) request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    /// No request has run yet
    Idle = 0,
    /// A request is executing
    Running = 1,
    /// Last request copied every resolvable item
    Completed = 2,
    /// Last request stopped on a copy failure
    Failed = 3,
    /// Last request was cancelled
    Cancelled = 4,
}

impl From<u8> for EngineState {
    fn from(value: u8) -> Self {
        match value {
            0 => EngineState::Idle,
            1 => EngineState::Running,
            2 => EngineState::Completed,
            3 => EngineState::Failed,
            4 => EngineState::Cancelled,
            _ => EngineState::Idle,
        }
    }
}

// =============================================================================
// Request / Outcome
// =============================================================================

/// The unit of work submitted to the engine
#[derive(Debug, Clone)]
pub struct TransferRequest {
    items: Vec<MediaItemHandle>,
    destination: DestinationAccess,
    delete_source_after_transfer: bool,
}

impl TransferRequest {
    pub fn new(items: Vec<MediaItemHandle>, destination: DestinationAccess) -> Self {
        Self {
            items,
            destination,
            delete_source_after_transfer: false,
        }
    }

    /// Remove copied items from the library once every copy has succeeded
    pub fn delete_source_after_transfer(mut self, delete: bool) -> Self {
        self.delete_source_after_transfer = delete;
        self
    }

    pub fn items(&self) -> &[MediaItemHandle] {
        &self.items
    }

    pub fn destination(&self) -> &DestinationAccess {
        &self.destination
    }

    pub fn deletes_source(&self) -> bool {
        self.delete_source_after_transfer
    }
}

/// Counters for one request
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TransferStats {
    pub files_copied: usize,
    pub files_skipped: usize,
    pub total_bytes: u64,
}

impl std::fmt::Display for TransferStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size_mb = self.total_bytes as f64 / 1_048_576.0;
        write!(
            f,
            "Copied: {}, Skipped (unresolved): {}, Total size: {:.2} MB",
            self.files_copied, self.files_skipped, size_mb
        )
    }
}

/// One successfully copied item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopiedItem {
    pub item_id: String,
    pub destination: PathBuf,
    pub bytes: u64,
}

/// Terminal result of a request
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferOutcome {
    /// Every resolvable item was copied
    Completed {
        stats: TransferStats,
        copied: Vec<CopiedItem>,
        /// Items that could not be resolved and were skipped
        skipped: Vec<MediaItemHandle>,
        /// Items handed to the library for deletion
        deleted: Vec<MediaItemHandle>,
        /// Set when the deletion batch failed; the transfer still succeeded
        deletion_error: Option<String>,
    },
    /// A copy failed; the remaining items were abandoned
    Failed {
        /// Zero-based position of the failing item in the request
        index: usize,
        item_id: String,
        detail: String,
        stats: TransferStats,
    },
    /// Cancelled before the next item started
    Cancelled { completed: usize, stats: TransferStats },
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Completed { .. })
    }

    /// Message handed to the completion callback, if any
    pub fn error_detail(&self) -> Option<&str> {
        match self {
            TransferOutcome::Completed { .. } => None,
            TransferOutcome::Failed { detail, .. } => Some(detail),
            TransferOutcome::Cancelled { .. } => Some(CANCELLED_DETAIL),
        }
    }

    pub fn stats(&self) -> &TransferStats {
        match self {
            TransferOutcome::Completed { stats, .. }
            | TransferOutcome::Failed { stats, .. }
            | TransferOutcome::Cancelled { stats, .. } => stats,
        }
    }
}

// =============================================================================
// Callbacks
// =============================================================================

/// Receives `completed / total` after each successful copy
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Receives `(success, error_detail)` exactly once
pub type CompletionCallback = Box<dyn FnOnce(bool, Option<String>) + Send>;

/// Progress and completion sink for one request
pub struct TransferCallbacks {
    on_progress: ProgressCallback,
    on_complete: Option<CompletionCallback>,
}

impl TransferCallbacks {
    pub fn new<P, C>(on_progress: P, on_complete: C) -> Self
    where
        P: Fn(f64) + Send + Sync + 'static,
        C: FnOnce(bool, Option<String>) + Send + 'static,
    {
        Self {
            on_progress: Arc::new(on_progress),
            on_complete: Some(Box::new(on_complete)),
        }
    }

    /// Callbacks that ignore every event
    pub fn none() -> Self {
        Self::new(|_| {}, |_, _| {})
    }

    fn progress(&self, dispatcher: &dyn Dispatcher, fraction: f64) {
        let cb = Arc::clone(&self.on_progress);
        dispatcher.dispatch(Box::new(move || cb(fraction)));
    }

    fn complete(&mut self, dispatcher: &dyn Dispatcher, success: bool, detail: Option<String>) {
        if let Some(cb) = self.on_complete.take() {
            dispatcher.dispatch(Box::new(move || cb(success, detail)));
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Engine tuning
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bounded wait for each item's resolution
    pub resolve_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

/// Copies media items out of a library into a destination folder
pub struct TransferEngine {
    source: Arc<dyn MediaSource>,
    deleter: Arc<dyn MediaDeleter>,
    fs: Arc<dyn FileSystem>,
    config: EngineConfig,
    state: Arc<AtomicU8>,
    cancel_flag: Arc<AtomicBool>,
    /// False once a caller-supplied flag replaces the engine's own
    owns_cancel_flag: bool,
}

impl TransferEngine {
    pub fn new(
        source: Arc<dyn MediaSource>,
        deleter: Arc<dyn MediaDeleter>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self::with_config(source, deleter, fs, EngineConfig::default())
    }

    pub fn with_config(
        source: Arc<dyn MediaSource>,
        deleter: Arc<dyn MediaDeleter>,
        fs: Arc<dyn FileSystem>,
        config: EngineConfig,
    ) -> Self {
        Self {
            source,
            deleter,
            fs,
            config,
            state: Arc::new(AtomicU8::new(EngineState::Idle as u8)),
            cancel_flag: Arc::new(AtomicBool::new(false)),
            owns_cancel_flag: true,
        }
    }

    /// Share an existing flag (e.g. one set by a Ctrl+C handler) as the
    /// cancellation signal. The engine never clears a shared flag, so a
    /// cancel raised before a request starts still stops it.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = flag;
        self.owns_cancel_flag = false;
        self
    }

    pub fn state(&self) -> EngineState {
        EngineState::from(self.state.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.state() == EngineState::Running
    }

    /// Ask the running request to stop before its next item
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    /// Resolve an item to a readable file, waiting at most the configured
    /// timeout.
    pub async fn resolve_source_location(
        &self,
        item: &MediaItemHandle,
    ) -> std::result::Result<PathBuf, ResolutionError> {
        let options = ResolveOptions::for_item(item);
        let timeout = self.config.resolve_timeout;

        match tokio::time::timeout(timeout, self.source.resolve_original(item, options)).await {
            Ok(Some(path)) => Ok(path),
            Ok(None) => Err(ResolutionError::Unavailable),
            Err(_) => Err(ResolutionError::Timeout(timeout)),
        }
    }

    /// First name derived from `proposed` that is free in `destination`
    pub fn unique_destination_name(&self, destination: &Path, proposed: &str) -> String {
        naming::unique_destination_name(self.fs.as_ref(), destination, proposed)
    }

    /// Copy `source` into a new file at `destination`.
    pub async fn copy_item(
        &self,
        source: &Path,
        destination: &Path,
    ) -> std::result::Result<u64, CopyError> {
        let fs = Arc::clone(&self.fs);
        let src = source.to_path_buf();
        let dst = destination.to_path_buf();

        let result = tokio::task::spawn_blocking(move || fs.copy(&src, &dst))
            .await
            .unwrap_or_else(|e| Err(std::io::Error::other(e.to_string())));

        result.map_err(|io| CopyError {
            source_path: source.to_path_buf(),
            destination_path: destination.to_path_buf(),
            io,
        })
    }

    /// Run a request on the current task and return its outcome.
    ///
    /// Callbacks are still delivered through `dispatcher`.
    pub async fn run(
        &self,
        request: TransferRequest,
        dispatcher: Arc<dyn Dispatcher>,
        callbacks: TransferCallbacks,
    ) -> Result<TransferOutcome> {
        self.begin()?;
        Ok(self.run_request(request, dispatcher, callbacks).await)
    }

    /// Spawn a request onto `runtime` and return immediately.
    ///
    /// Fails with [`TransferError::AlreadyRunning`] if a request is active.
    pub fn execute(
        self: &Arc<Self>,
        runtime: &Handle,
        request: TransferRequest,
        dispatcher: Arc<dyn Dispatcher>,
        callbacks: TransferCallbacks,
    ) -> Result<JoinHandle<TransferOutcome>> {
        self.begin()?;
        let engine = Arc::clone(self);
        Ok(runtime.spawn(async move { engine.run_request(request, dispatcher, callbacks).await }))
    }

    fn begin(&self) -> Result<()> {
        self.state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                if current == EngineState::Running as u8 {
                    None
                } else {
                    Some(EngineState::Running as u8)
                }
            })
            .map_err(|_| TransferError::AlreadyRunning)?;
        if self.owns_cancel_flag {
            self.cancel_flag.store(false, Ordering::SeqCst);
        }
        Ok(())
    }

    fn finish(&self, state: EngineState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    async fn run_request(
        &self,
        request: TransferRequest,
        dispatcher: Arc<dyn Dispatcher>,
        mut callbacks: TransferCallbacks,
    ) -> TransferOutcome {
        let start_time = Instant::now();
        let destination = request.destination().path().to_path_buf();
        let total = request.items().len();

        info!(
            "Transferring {} item(s) to {}{}",
            total,
            destination.display(),
            if request.deletes_source() {
                " (originals will be deleted)"
            } else {
                ""
            }
        );

        let mut stats = TransferStats::default();
        let mut copied = Vec::new();
        let mut skipped = Vec::new();
        let mut pending_deletion = Vec::new();
        let mut completed = 0usize;

        for (index, item) in request.items().iter().enumerate() {
            if self.cancel_flag.load(Ordering::SeqCst) {
                warn!("Cancellation requested, stopping transfer...");
                self.finish(EngineState::Cancelled);
                callbacks.complete(
                    dispatcher.as_ref(),
                    false,
                    Some(CANCELLED_DETAIL.to_string()),
                );
                return TransferOutcome::Cancelled { completed, stats };
            }

            let source = match self.resolve_source_location(item).await {
                Ok(path) => path,
                Err(e) => {
                    warn!("Skipping '{}': {}", item.id(), e);
                    stats.files_skipped += 1;
                    skipped.push(item.clone());
                    continue;
                }
            };

            let proposed = proposed_name(&source, item);
            let name = self.unique_destination_name(&destination, &proposed);
            let target = destination.join(&name);

            let bytes = match self.copy_item(&source, &target).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    let detail = e.to_string();
                    error!(
                        "Failed to copy '{}' to {}: {}",
                        item.id(),
                        target.display(),
                        e.io
                    );
                    self.finish(EngineState::Failed);
                    callbacks.complete(dispatcher.as_ref(), false, Some(detail.clone()));
                    return TransferOutcome::Failed {
                        index,
                        item_id: item.id().to_string(),
                        detail,
                        stats,
                    };
                }
            };

            debug!("Copied: {} ({} bytes)", target.display(), bytes);
            stats.files_copied += 1;
            stats.total_bytes += bytes;
            copied.push(CopiedItem {
                item_id: item.id().to_string(),
                destination: target,
                bytes,
            });

            if request.deletes_source() {
                pending_deletion.push(item.clone());
            }

            completed += 1;
            callbacks.progress(dispatcher.as_ref(), completed as f64 / total as f64);
        }

        let mut deletion_error = None;
        if !pending_deletion.is_empty() {
            info!(
                "Deleting {} original(s) from the library",
                pending_deletion.len()
            );
            if let Err(e) = self.deleter.delete_items(&pending_deletion).await {
                warn!("Error deleting originals: {}", e);
                deletion_error = Some(e.to_string());
            }
        }

        info!(
            "Transfer complete in {:.1}s. {}",
            start_time.elapsed().as_secs_f64(),
            stats
        );

        self.finish(EngineState::Completed);
        callbacks.complete(dispatcher.as_ref(), true, None);

        TransferOutcome::Completed {
            stats,
            copied,
            skipped,
            deleted: pending_deletion,
            deletion_error,
        }
    }
}

/// Base name of the resolved source, falling back to the item id
fn proposed_name(source: &Path, item: &MediaItemHandle) -> String {
    source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| item.id().replace('/', "-"))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{ChannelDispatcher, InlineDispatcher};
    use crate::library::{Representation, StdFileSystem};
    use crate::testdb::{FaultyFileSystem, MockMediaLibrary};
    use std::fs;
    use std::io;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records every callback, and mirrors progress into the library journal
    #[derive(Clone, Default)]
    struct Recorder {
        progress: Arc<Mutex<Vec<f64>>>,
        completions: Arc<Mutex<Vec<(bool, Option<String>)>>>,
    }

    impl Recorder {
        fn callbacks(&self, journal: Arc<Mutex<Vec<String>>>) -> TransferCallbacks {
            let progress = Arc::clone(&self.progress);
            let progress_journal = Arc::clone(&journal);
            let completions = Arc::clone(&self.completions);
            TransferCallbacks::new(
                move |fraction| {
                    progress.lock().unwrap().push(fraction);
                    progress_journal
                        .lock()
                        .unwrap()
                        .push(format!("progress:{}", fraction));
                },
                move |success, detail| {
                    completions.lock().unwrap().push((success, detail));
                    journal.lock().unwrap().push("complete".to_string());
                },
            )
        }

        fn progress(&self) -> Vec<f64> {
            self.progress.lock().unwrap().clone()
        }

        fn completions(&self) -> Vec<(bool, Option<String>)> {
            self.completions.lock().unwrap().clone()
        }
    }

    struct Fixture {
        _library_dir: TempDir,
        dest_dir: TempDir,
        library: MockMediaLibrary,
    }

    impl Fixture {
        fn new() -> Self {
            let library_dir = TempDir::new().unwrap();
            let dest_dir = TempDir::new().unwrap();
            let library = MockMediaLibrary::new(library_dir.path());
            Self {
                _library_dir: library_dir,
                dest_dir,
                library,
            }
        }

        fn engine(&self) -> TransferEngine {
            self.engine_with(Arc::new(StdFileSystem), EngineConfig::default())
        }

        fn engine_with(&self, fs: Arc<dyn FileSystem>, config: EngineConfig) -> TransferEngine {
            let library = Arc::new(self.library.clone());
            TransferEngine::with_config(library.clone(), library, fs, config)
        }

        fn destination(&self) -> DestinationAccess {
            DestinationAccess::acquire(self.dest_dir.path()).unwrap()
        }

        fn dest_files(&self) -> Vec<String> {
            let mut names: Vec<String> = fs::read_dir(self.dest_dir.path())
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }
    }

    fn inline() -> Arc<dyn Dispatcher> {
        Arc::new(InlineDispatcher)
    }

    #[tokio::test]
    async fn test_photo_and_video_scenario() {
        let fx = Fixture::new();
        let photo = fx.library.add_photo("A", "IMG_0001.JPG", b"photo-bytes");
        let video = fx
            .library
            .add_video("B", "IMG_0002.MOV", b"video-bytes", Duration::from_secs(4));
        let recorder = Recorder::default();

        let request = TransferRequest::new(vec![photo, video], fx.destination());
        let outcome = fx
            .engine()
            .run(request, inline(), recorder.callbacks(fx.library.journal()))
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(recorder.progress(), vec![0.5, 1.0]);
        assert_eq!(recorder.completions(), vec![(true, None)]);
        assert_eq!(fx.dest_files(), vec!["IMG_0001.JPG", "IMG_0002.MOV"]);
        assert!(fx.library.deletion_calls().is_empty());
        assert_eq!(
            fs::read(fx.dest_dir.path().join("IMG_0002.MOV")).unwrap(),
            b"video-bytes"
        );
        assert_eq!(outcome.stats().files_copied, 2);
        assert_eq!(outcome.stats().total_bytes, 22);
    }

    #[tokio::test]
    async fn test_progress_is_strictly_increasing() {
        let fx = Fixture::new();
        let items: Vec<_> = (0..7)
            .map(|i| fx.library.add_photo(&format!("p{}", i), &format!("{}.jpg", i), b"x"))
            .collect();
        let recorder = Recorder::default();

        let request = TransferRequest::new(items, fx.destination());
        fx.engine()
            .run(request, inline(), recorder.callbacks(fx.library.journal()))
            .await
            .unwrap();

        let progress = recorder.progress();
        assert_eq!(progress.len(), 7);
        for (i, fraction) in progress.iter().enumerate() {
            assert!((fraction - (i + 1) as f64 / 7.0).abs() < 1e-9);
        }
        assert!(progress.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*progress.last().unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_duplicate_source_names_are_numbered() {
        let fx = Fixture::new();
        let a = fx.library.add_photo("A", "img.jpg", b"first");
        let b = fx.library.add_photo("B", "img.jpg", b"second");
        let recorder = Recorder::default();

        let request = TransferRequest::new(vec![a, b], fx.destination());
        fx.engine()
            .run(request, inline(), recorder.callbacks(fx.library.journal()))
            .await
            .unwrap();

        assert_eq!(fx.dest_files(), vec!["img (1).jpg", "img.jpg"]);
        assert_eq!(fs::read(fx.dest_dir.path().join("img.jpg")).unwrap(), b"first");
        assert_eq!(
            fs::read(fx.dest_dir.path().join("img (1).jpg")).unwrap(),
            b"second"
        );
    }

    #[tokio::test]
    async fn test_existing_files_are_never_overwritten() {
        let fx = Fixture::new();
        fs::write(fx.dest_dir.path().join("img.jpg"), b"from an earlier run").unwrap();
        let item = fx.library.add_photo("A", "img.jpg", b"new");

        let request = TransferRequest::new(vec![item], fx.destination());
        fx.engine()
            .run(request, inline(), TransferCallbacks::none())
            .await
            .unwrap();

        assert_eq!(
            fs::read(fx.dest_dir.path().join("img.jpg")).unwrap(),
            b"from an earlier run"
        );
        assert_eq!(fs::read(fx.dest_dir.path().join("img (1).jpg")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_copy_failure_aborts_request() {
        let fx = Fixture::new();
        let items = vec![
            fx.library.add_photo("1", "one.jpg", b"1"),
            fx.library.add_photo("2", "two.jpg", b"2"),
            fx.library.add_vanished("3", "three.jpg"),
            fx.library.add_photo("4", "four.jpg", b"4"),
        ];
        let recorder = Recorder::default();

        let request = TransferRequest::new(items, fx.destination()).delete_source_after_transfer(true);
        let engine = fx.engine();
        let outcome = engine
            .run(request, inline(), recorder.callbacks(fx.library.journal()))
            .await
            .unwrap();

        match &outcome {
            TransferOutcome::Failed {
                index, item_id, detail, ..
            } => {
                assert_eq!(*index, 2);
                assert_eq!(item_id, "3");
                assert!(detail.starts_with("Error copying file:"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(engine.state(), EngineState::Failed);
        assert!(recorder.progress().len() <= 2);
        let completions = recorder.completions();
        assert_eq!(completions.len(), 1);
        assert!(!completions[0].0);
        assert!(completions[0].1.is_some());
        // Already-copied files stay, nothing after the failure is copied
        assert_eq!(fx.dest_files(), vec!["one.jpg", "two.jpg"]);
        assert!(fx.library.deletion_calls().is_empty());
    }

    #[tokio::test]
    async fn test_copy_failure_on_first_item_emits_no_progress() {
        let fx = Fixture::new();
        let items = vec![
            fx.library.add_photo("1", "full.jpg", b"1"),
            fx.library.add_photo("2", "other.jpg", b"2"),
        ];
        let recorder = Recorder::default();
        let faulty = Arc::new(FaultyFileSystem::failing_on(&["full"], io::ErrorKind::Other));

        let request = TransferRequest::new(items, fx.destination());
        let outcome = fx
            .engine_with(faulty, EngineConfig::default())
            .run(request, inline(), recorder.callbacks(fx.library.journal()))
            .await
            .unwrap();

        assert_eq!(outcome.error_detail(), Some("Error copying file: No space left on device"));
        assert!(recorder.progress().is_empty());
        assert_eq!(
            recorder.completions(),
            vec![(
                false,
                Some("Error copying file: No space left on device".to_string())
            )]
        );
    }

    #[tokio::test]
    async fn test_failed_copy_leaves_no_partial_file() {
        let fx = Fixture::new();
        let items = vec![
            fx.library.add_directory("d", "d"),
            fx.library.add_photo("2", "two.jpg", b"2"),
        ];
        let recorder = Recorder::default();

        let request = TransferRequest::new(items, fx.destination());
        let outcome = fx
            .engine()
            .run(request, inline(), recorder.callbacks(fx.library.journal()))
            .await
            .unwrap();

        assert!(matches!(outcome, TransferOutcome::Failed { index: 0, .. }));
        assert!(recorder.progress().is_empty());
        assert!(fx.dest_files().is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_items_are_skipped() {
        let fx = Fixture::new();
        let items = vec![
            fx.library.add_photo("1", "a.jpg", b"a"),
            fx.library.add_unresolvable("2"),
            fx.library.add_photo("3", "c.jpg", b"c"),
        ];
        let recorder = Recorder::default();

        let request = TransferRequest::new(items, fx.destination()).delete_source_after_transfer(true);
        let outcome = fx
            .engine()
            .run(request, inline(), recorder.callbacks(fx.library.journal()))
            .await
            .unwrap();

        assert!(outcome.is_success());
        // Progress is measured against the full request
        let progress = recorder.progress();
        assert_eq!(progress.len(), 2);
        assert!((progress[0] - 1.0 / 3.0).abs() < 1e-9);
        assert!((progress[1] - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(fx.dest_files(), vec!["a.jpg", "c.jpg"]);
        assert_eq!(
            fx.library.deletion_calls(),
            vec![vec!["1".to_string(), "3".to_string()]]
        );
        if let TransferOutcome::Completed { skipped, stats, .. } = outcome {
            assert_eq!(skipped.len(), 1);
            assert_eq!(skipped[0].id(), "2");
            assert_eq!(stats.files_skipped, 1);
        }
    }

    #[tokio::test]
    async fn test_resolution_timeout_skips_item() {
        let fx = Fixture::new();
        let items = vec![
            fx.library
                .add_slow("slow", "slow.jpg", b"s", Duration::from_secs(5)),
            fx.library.add_photo("fast", "fast.jpg", b"f"),
        ];
        let recorder = Recorder::default();
        let config = EngineConfig {
            resolve_timeout: Duration::from_millis(50),
        };

        let request = TransferRequest::new(items, fx.destination());
        let outcome = fx
            .engine_with(Arc::new(StdFileSystem), config)
            .run(request, inline(), recorder.callbacks(fx.library.journal()))
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.stats().files_skipped, 1);
        assert_eq!(fx.dest_files(), vec!["fast.jpg"]);
        assert_eq!(recorder.progress(), vec![1.0]);
    }

    #[tokio::test]
    async fn test_resolve_source_location_errors() {
        let fx = Fixture::new();
        let missing = fx.library.add_unresolvable("missing");
        let slow = fx
            .library
            .add_slow("slow", "slow.jpg", b"s", Duration::from_secs(5));
        let engine = fx.engine_with(
            Arc::new(StdFileSystem),
            EngineConfig {
                resolve_timeout: Duration::from_millis(20),
            },
        );

        assert_eq!(
            engine.resolve_source_location(&missing).await,
            Err(ResolutionError::Unavailable)
        );
        assert_eq!(
            engine.resolve_source_location(&slow).await,
            Err(ResolutionError::Timeout(Duration::from_millis(20)))
        );
    }

    #[tokio::test]
    async fn test_resolution_uses_kind_specific_options() {
        let fx = Fixture::new();
        let items = vec![
            fx.library.add_photo("p", "p.jpg", b"p"),
            fx.library
                .add_video("v", "v.mov", b"v", Duration::from_secs(1)),
        ];

        let request = TransferRequest::new(items, fx.destination());
        fx.engine()
            .run(request, inline(), TransferCallbacks::none())
            .await
            .unwrap();

        let calls = fx.library.resolve_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "p");
        assert_eq!(calls[0].1.representation, Representation::FullSizeImage);
        assert_eq!(calls[1].0, "v");
        assert_eq!(calls[1].1.representation, Representation::OriginalVideo);
        assert!(calls.iter().all(|(_, o)| o.network_access_allowed));
    }

    #[tokio::test]
    async fn test_deletion_happens_once_between_progress_and_completion() {
        let fx = Fixture::new();
        let items = vec![
            fx.library.add_photo("1", "1.jpg", b"1"),
            fx.library.add_photo("2", "2.jpg", b"2"),
        ];
        let recorder = Recorder::default();
        let journal = fx.library.journal();

        let request = TransferRequest::new(items, fx.destination()).delete_source_after_transfer(true);
        let outcome = fx
            .engine()
            .run(request, inline(), recorder.callbacks(Arc::clone(&journal)))
            .await
            .unwrap();

        assert_eq!(
            fx.library.deletion_calls(),
            vec![vec!["1".to_string(), "2".to_string()]]
        );
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["progress:0.5", "progress:1", "delete:1,2", "complete"]
        );
        if let TransferOutcome::Completed { deleted, .. } = outcome {
            assert_eq!(deleted.len(), 2);
        } else {
            panic!("expected success");
        }
    }

    #[tokio::test]
    async fn test_deletion_failure_does_not_fail_transfer() {
        let fx = Fixture::new();
        let item = fx.library.add_photo("1", "1.jpg", b"1");
        fx.library.fail_deletions();
        let recorder = Recorder::default();

        let request = TransferRequest::new(vec![item], fx.destination()).delete_source_after_transfer(true);
        let outcome = fx
            .engine()
            .run(request, inline(), recorder.callbacks(fx.library.journal()))
            .await
            .unwrap();

        assert_eq!(recorder.completions(), vec![(true, None)]);
        match outcome {
            TransferOutcome::Completed { deletion_error, .. } => {
                assert!(deletion_error.is_some());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_deletion_when_flag_is_off() {
        let fx = Fixture::new();
        let items = vec![
            fx.library.add_photo("1", "1.jpg", b"1"),
            fx.library.add_vanished("2", "2.jpg"),
        ];

        let request = TransferRequest::new(items, fx.destination());
        let outcome = fx
            .engine()
            .run(request, inline(), TransferCallbacks::none())
            .await
            .unwrap();

        assert!(!outcome.is_success());
        assert!(fx.library.deletion_calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_request_completes_without_progress() {
        let fx = Fixture::new();
        let recorder = Recorder::default();

        let request = TransferRequest::new(Vec::new(), fx.destination()).delete_source_after_transfer(true);
        let outcome = fx
            .engine()
            .run(request, inline(), recorder.callbacks(fx.library.journal()))
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert!(recorder.progress().is_empty());
        assert_eq!(recorder.completions(), vec![(true, None)]);
        assert!(fx.library.deletion_calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_stops_before_next_item() {
        let fx = Fixture::new();
        let items = vec![
            fx.library
                .add_slow("slow", "slow.jpg", b"s", Duration::from_millis(50)),
            fx.library.add_photo("next", "next.jpg", b"n"),
        ];
        let recorder = Recorder::default();
        let flag = Arc::new(AtomicBool::new(false));
        let engine = fx.engine().with_cancel_flag(Arc::clone(&flag));

        // Raise the flag while the first item is still resolving
        let canceller = {
            let flag = Arc::clone(&flag);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                flag.store(true, Ordering::SeqCst);
            })
        };

        let request = TransferRequest::new(items, fx.destination()).delete_source_after_transfer(true);
        let outcome = engine
            .run(request, inline(), recorder.callbacks(fx.library.journal()))
            .await
            .unwrap();
        canceller.await.unwrap();

        match outcome {
            TransferOutcome::Cancelled { completed, .. } => assert_eq!(completed, 1),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(engine.state(), EngineState::Cancelled);
        assert_eq!(recorder.progress(), vec![0.5]);
        assert_eq!(
            recorder.completions(),
            vec![(false, Some(CANCELLED_DETAIL.to_string()))]
        );
        assert_eq!(fx.dest_files(), vec!["slow.jpg"]);
        assert!(fx.library.deletion_calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_raised_before_run_is_honored() {
        let fx = Fixture::new();
        let items = vec![fx.library.add_photo("a", "a.jpg", b"a")];
        let recorder = Recorder::default();
        let flag = Arc::new(AtomicBool::new(true));
        let engine = fx.engine().with_cancel_flag(Arc::clone(&flag));

        let request = TransferRequest::new(items, fx.destination()).delete_source_after_transfer(true);
        let outcome = engine
            .run(request, inline(), recorder.callbacks(fx.library.journal()))
            .await
            .unwrap();

        assert!(matches!(outcome, TransferOutcome::Cancelled { completed: 0, .. }));
        assert!(flag.load(Ordering::SeqCst));
        assert!(recorder.progress().is_empty());
        assert_eq!(
            recorder.completions(),
            vec![(false, Some(CANCELLED_DETAIL.to_string()))]
        );
        assert!(fx.dest_files().is_empty());
        assert!(fx.library.deletion_calls().is_empty());
    }

    #[tokio::test]
    async fn test_own_cancel_flag_resets_between_requests() {
        let fx = Fixture::new();
        let engine = fx.engine();
        engine.cancel();

        let first = fx.library.add_photo("a", "a.jpg", b"a");
        let outcome = engine
            .run(
                TransferRequest::new(vec![first], fx.destination()),
                inline(),
                TransferCallbacks::none(),
            )
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(fx.dest_files(), vec!["a.jpg"]);
    }

    #[tokio::test]
    async fn test_execute_delivers_through_channel_dispatcher() {
        let fx = Fixture::new();
        let items = vec![
            fx.library.add_photo("1", "1.jpg", b"1"),
            fx.library.add_photo("2", "2.jpg", b"2"),
        ];
        let (dispatcher, queue) = ChannelDispatcher::new();
        let recorder = Recorder::default();
        let engine = Arc::new(fx.engine());

        let request = TransferRequest::new(items, fx.destination());
        let handle = engine
            .execute(
                &Handle::current(),
                request,
                Arc::new(dispatcher),
                recorder.callbacks(fx.library.journal()),
            )
            .unwrap();
        let outcome = handle.await.unwrap();

        // Nothing runs until the consumer drains its queue
        assert!(recorder.progress().is_empty());
        assert_eq!(queue.run_until_closed(), 3);
        assert!(outcome.is_success());
        assert_eq!(recorder.progress(), vec![0.5, 1.0]);
        assert_eq!(recorder.completions(), vec![(true, None)]);
    }

    #[tokio::test]
    async fn test_second_request_rejected_while_running() {
        let fx = Fixture::new();
        let slow = fx
            .library
            .add_slow("slow", "slow.jpg", b"s", Duration::from_millis(100));
        let engine = Arc::new(fx.engine());

        let first = engine
            .execute(
                &Handle::current(),
                TransferRequest::new(vec![slow], fx.destination()),
                inline(),
                TransferCallbacks::none(),
            )
            .unwrap();
        assert!(engine.is_running());

        let second = engine.execute(
            &Handle::current(),
            TransferRequest::new(Vec::new(), fx.destination()),
            inline(),
            TransferCallbacks::none(),
        );
        assert!(matches!(second, Err(TransferError::AlreadyRunning)));

        assert!(first.await.unwrap().is_success());
        assert_eq!(engine.state(), EngineState::Completed);
    }

    #[test]
    fn test_engine_state_conversion() {
        assert_eq!(EngineState::from(0), EngineState::Idle);
        assert_eq!(EngineState::from(1), EngineState::Running);
        assert_eq!(EngineState::from(2), EngineState::Completed);
        assert_eq!(EngineState::from(3), EngineState::Failed);
        assert_eq!(EngineState::from(4), EngineState::Cancelled);
        assert_eq!(EngineState::from(255), EngineState::Idle);
    }

    #[test]
    fn test_proposed_name_falls_back_to_id() {
        let item = MediaItemHandle::photo("ABC/L0/001");
        assert_eq!(proposed_name(Path::new("/lib/IMG_1.JPG"), &item), "IMG_1.JPG");
        assert_eq!(proposed_name(Path::new("/"), &item), "ABC-L0-001");
    }

    #[test]
    fn test_stats_display() {
        let stats = TransferStats {
            files_copied: 3,
            files_skipped: 1,
            total_bytes: 2 * 1_048_576,
        };
        assert_eq!(
            stats.to_string(),
            "Copied: 3, Skipped (unresolved): 1, Total size: 2.00 MB"
        );
    }
}
