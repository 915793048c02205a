//! Fakes shared by the core-sync integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::media::{GenerationOracle, MediaIndex, RawFileRef, RescanProgress};
use bridge_traits::tags::keys;
use bridge_traits::{ArtworkExtractor, DecodedArtwork, RawTags, TagReader};
use core_library::models::{Album, Track};
use core_library::{LibraryCache, LibraryError, SqliteLibraryCache};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Files
// ============================================================================

/// `n` files spread over three album directories, ids `1..=n`.
pub fn file_list(n: usize) -> Vec<RawFileRef> {
    (0..n)
        .map(|i| {
            RawFileRef::new(
                i as i64 + 1,
                format!("/music/Album {}/Track {}.flac", i % 3, i),
            )
        })
        .collect()
}

/// Tags derived from a `file_list` path: album from the directory, title from
/// the file stem.
pub fn tags_for(path: &Path) -> RawTags {
    let album = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let title = path
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    RawTags::new()
        .with_field(keys::TITLE, title)
        .with_field(keys::ARTIST, "Artist")
        .with_field(keys::ALBUM, album)
        .with_duration_ms(180_000)
}

// ============================================================================
// Tag reader
// ============================================================================

type TagFn = dyn Fn(&Path) -> BridgeResult<RawTags> + Send + Sync;

pub struct FakeTagReader {
    read: Box<TagFn>,
    jitter: bool,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl FakeTagReader {
    pub fn new<F>(read: F) -> Self
    where
        F: Fn(&Path) -> BridgeResult<RawTags> + Send + Sync + 'static,
    {
        Self {
            read: Box::new(read),
            jitter: false,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn tagged() -> Self {
        Self::new(|path| Ok(tags_for(path)))
    }

    pub fn failing() -> Self {
        Self::new(|path| Err(BridgeError::OperationFailed(format!("corrupt: {}", path.display()))))
    }

    /// Sleep a few milliseconds per file, varying by path, so tasks finish
    /// out of order.
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl TagReader for FakeTagReader {
    async fn read_tags(&self, path: &Path) -> BridgeResult<RawTags> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.jitter {
            let spread = path.to_string_lossy().bytes().map(u64::from).sum::<u64>() % 7;
            tokio::time::sleep(Duration::from_millis(1 + spread * 2)).await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        (self.read)(path)
    }
}

// ============================================================================
// Artwork
// ============================================================================

#[derive(Clone, Copy)]
enum ArtworkMode {
    None,
    Solid,
    Failing,
}

pub struct FakeArtwork {
    mode: ArtworkMode,
    calls: Arc<AtomicUsize>,
}

impl FakeArtwork {
    fn with_mode(mode: ArtworkMode) -> Self {
        Self {
            mode,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every track has no artwork.
    pub fn none() -> Self {
        Self::with_mode(ArtworkMode::None)
    }

    /// A saturated red square at the requested size.
    pub fn solid() -> Self {
        Self::with_mode(ArtworkMode::Solid)
    }

    pub fn failing() -> Self {
        Self::with_mode(ArtworkMode::Failing)
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ArtworkExtractor for FakeArtwork {
    async fn extract_artwork(
        &self,
        content_ref: &str,
        max_size: u32,
    ) -> BridgeResult<Option<DecodedArtwork>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.mode {
            ArtworkMode::None => Ok(None),
            ArtworkMode::Failing => Err(BridgeError::OperationFailed(format!(
                "no decoder for {content_ref}"
            ))),
            ArtworkMode::Solid => {
                let size = max_size.clamp(1, 64);
                let rgb = [200u8, 40, 40].repeat((size * size) as usize);
                Ok(DecodedArtwork::new(size, size, rgb))
            }
        }
    }
}

// ============================================================================
// Media index
// ============================================================================

pub struct FakeMediaIndex {
    files: Mutex<Vec<RawFileRef>>,
    generation: Mutex<Option<i64>>,
    roots: Vec<PathBuf>,
    fail_enumerate: AtomicBool,
    fail_rescan: AtomicBool,
    rescan_delay: Mutex<Option<Duration>>,
    enumerations: AtomicUsize,
    rescans: Mutex<Vec<PathBuf>>,
}

impl FakeMediaIndex {
    pub fn new(files: Vec<RawFileRef>) -> Self {
        Self {
            files: Mutex::new(files),
            generation: Mutex::new(None),
            roots: vec![PathBuf::from("/music")],
            fail_enumerate: AtomicBool::new(false),
            fail_rescan: AtomicBool::new(false),
            rescan_delay: Mutex::new(None),
            enumerations: AtomicUsize::new(0),
            rescans: Mutex::new(Vec::new()),
        }
    }

    pub fn with_generation(self, generation: i64) -> Self {
        self.set_generation(Some(generation));
        self
    }

    pub fn with_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.roots = roots;
        self
    }

    pub fn set_generation(&self, generation: Option<i64>) {
        *self.generation.lock().unwrap() = generation;
    }

    pub fn set_files(&self, files: Vec<RawFileRef>) {
        *self.files.lock().unwrap() = files;
    }

    pub fn fail_enumeration(&self, fail: bool) {
        self.fail_enumerate.store(fail, Ordering::SeqCst);
    }

    pub fn fail_rescan(&self, fail: bool) {
        self.fail_rescan.store(fail, Ordering::SeqCst);
    }

    /// Pause between rescan progress reports.
    pub fn set_rescan_delay(&self, delay: Duration) {
        *self.rescan_delay.lock().unwrap() = Some(delay);
    }

    pub fn enumerations(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }

    pub fn rescanned_roots(&self) -> Vec<PathBuf> {
        self.rescans.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationOracle for FakeMediaIndex {
    async fn current_generation(&self) -> Option<i64> {
        *self.generation.lock().unwrap()
    }
}

#[async_trait]
impl MediaIndex for FakeMediaIndex {
    async fn enumerate_audio_files(&self) -> BridgeResult<Vec<RawFileRef>> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        if self.fail_enumerate.load(Ordering::SeqCst) {
            return Err(BridgeError::NotAvailable("media index offline".to_string()));
        }
        Ok(self.files.lock().unwrap().clone())
    }

    fn content_ref(&self, file: &RawFileRef) -> String {
        format!("fake://{}", file.id)
    }

    fn roots(&self) -> Vec<PathBuf> {
        self.roots.clone()
    }

    async fn request_rescan(
        &self,
        root: &Path,
        progress: &(dyn Fn(RescanProgress) + Send + Sync),
    ) -> BridgeResult<()> {
        self.rescans.lock().unwrap().push(root.to_path_buf());
        if self.fail_rescan.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("rescan refused".to_string()));
        }

        let total = self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.path.starts_with(root))
            .count();
        let delay = *self.rescan_delay.lock().unwrap();

        progress(RescanProgress { completed: 0, total });
        for completed in 1..=total {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            progress(RescanProgress { completed, total });
        }
        Ok(())
    }
}

// ============================================================================
// Library cache
// ============================================================================

/// Delegates to SQLite but can be told to fail `commit_library`.
pub struct FlakyCache {
    inner: SqliteLibraryCache,
    fail_commit: AtomicBool,
    commits: AtomicUsize,
}

impl FlakyCache {
    pub fn new(inner: SqliteLibraryCache) -> Self {
        Self {
            inner,
            fail_commit: AtomicBool::new(false),
            commits: AtomicUsize::new(0),
        }
    }

    pub fn fail_commits(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst);
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LibraryCache for FlakyCache {
    async fn get_config_value(&self, key: &str) -> core_library::Result<Option<String>> {
        self.inner.get_config_value(key).await
    }

    async fn set_config_value(&self, key: &str, value: &str) -> core_library::Result<()> {
        self.inner.set_config_value(key, value).await
    }

    async fn replace_all_tracks(&self, tracks: &[Track]) -> core_library::Result<()> {
        self.inner.replace_all_tracks(tracks).await
    }

    async fn replace_all_albums(&self, albums: &[Album]) -> core_library::Result<()> {
        self.inner.replace_all_albums(albums).await
    }

    async fn delete_tracks(&self, ids: &[i64]) -> core_library::Result<()> {
        self.inner.delete_tracks(ids).await
    }

    async fn delete_albums(&self, ids: &[String]) -> core_library::Result<()> {
        self.inner.delete_albums(ids).await
    }

    async fn commit_library(
        &self,
        tracks: &[Track],
        albums: &[Album],
        generation: Option<i64>,
    ) -> core_library::Result<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(LibraryError::InvalidInput {
                field: "library".to_string(),
                message: "disk full".to_string(),
            });
        }
        self.inner.commit_library(tracks, albums, generation).await
    }
}
