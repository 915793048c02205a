//! # Sync Coordinator
//!
//! Keeps the library cache in step with the media index.
//!
//! ## Workflow
//!
//! ### `sync(force)`
//! 1. Compare the stored generation with the media index's current one and
//!    stop early when both are known and equal (unless `force`)
//! 2. Enumerate audio files
//! 3. Extract metadata concurrently (`MetadataExtractionPipeline`)
//! 4. Fold results into tracks and albums (`LibraryReconciler`)
//! 5. Commit tracks, albums and the new generation in one transaction
//!
//! ### `full_scan_and_sync()`
//! Asks the media index to rescan every root first, reporting
//! `Scanning(current, total)`, then always runs a forced sync.
//!
//! Runs are serialized. Each one gets a [`RunId`] carried by every
//! [`SyncEvent`] it emits. The discovery state returns to `Idle` on every
//! exit path.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let coordinator = SyncCoordinator::new(
//!     SyncConfig::default(),
//!     media_index,
//!     tag_reader,
//!     artwork,
//!     cache,
//!     event_bus,
//! );
//!
//! let result = coordinator.sync_if_changed().await;
//! if result.skipped {
//!     println!("Library already current");
//! }
//! ```

use bridge_traits::{ArtworkExtractor, MediaIndex, RescanProgress, TagReader};
use core_library::models::{Album, Track};
use core_library::LibraryCache;
use core_runtime::config::{CoreConfig, DEFAULT_ALBUM_THUMBNAIL_SIZE};
use core_runtime::events::{CoreEvent, DiscoveryEvent, EventBus, LibraryEvent, SyncEvent};
use core_runtime::{DiscoveryState, DiscoveryStateHolder, DiscoveryStateWatcher};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{Result, SyncError};
use crate::pipeline::{MetadataExtractionPipeline, PipelineConfig};
use crate::reconciler::LibraryReconciler;

/// Rescan completions between two `Scanning` updates.
pub const SCAN_PROGRESS_INTERVAL: usize = 50;

/// Sync coordinator configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub pipeline: PipelineConfig,

    /// Bounding box of stored album thumbnails
    pub album_thumbnail_size: u32,

    /// Watchdog for a whole run, rescan included. `None` disables it.
    pub run_timeout: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            album_thumbnail_size: DEFAULT_ALBUM_THUMBNAIL_SIZE,
            run_timeout: None,
        }
    }
}

impl SyncConfig {
    /// Engine settings taken from the core configuration.
    pub fn from_core_config(config: &CoreConfig) -> Self {
        Self {
            pipeline: PipelineConfig::default()
                .with_max_concurrency(config.max_concurrency)
                .with_preview_size(config.preview_thumbnail_size),
            album_thumbnail_size: config.album_thumbnail_size,
            run_timeout: None,
        }
    }

    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_album_thumbnail_size(mut self, size: u32) -> Self {
        self.album_thumbnail_size = size;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }
}

/// Identifier of one sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a sync call.
///
/// On success `tracks` and `albums` are what was committed (favorite flags
/// as reconciled, before the cache merged stored favorites back in). Skipped
/// and failed runs carry empty lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub run_id: RunId,
    pub tracks: Vec<Track>,
    pub albums: Vec<Album>,
    pub error: Option<String>,
    pub skipped: bool,
}

impl DiscoveryResult {
    fn completed(run_id: RunId, tracks: Vec<Track>, albums: Vec<Album>) -> Self {
        Self {
            run_id,
            tracks,
            albums,
            error: None,
            skipped: false,
        }
    }

    fn skipped(run_id: RunId) -> Self {
        Self {
            run_id,
            tracks: Vec::new(),
            albums: Vec::new(),
            error: None,
            skipped: true,
        }
    }

    fn failed(run_id: RunId, error: &SyncError) -> Self {
        Self {
            run_id,
            tracks: Vec::new(),
            albums: Vec::new(),
            error: Some(error.to_string()),
            skipped: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

enum Outcome {
    Skipped { generation: i64 },
    Committed { tracks: Vec<Track>, albums: Vec<Album> },
}

/// Run `fut` unless `token` fires first.
async fn until_cancelled<F: Future>(token: &CancellationToken, fut: F) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(SyncError::Cancelled),
        output = fut => Ok(output),
    }
}

pub struct SyncCoordinator {
    config: SyncConfig,
    media_index: Arc<dyn MediaIndex>,
    cache: Arc<dyn LibraryCache>,
    pipeline: MetadataExtractionPipeline,
    reconciler: LibraryReconciler,
    events: EventBus,
    state: Arc<DiscoveryStateHolder>,
    /// Held for the duration of a run
    run_lock: Mutex<()>,
    /// Token of the run in progress
    active: std::sync::Mutex<Option<CancellationToken>>,
}

impl SyncCoordinator {
    pub fn new(
        config: SyncConfig,
        media_index: Arc<dyn MediaIndex>,
        tag_reader: Arc<dyn TagReader>,
        artwork: Arc<dyn ArtworkExtractor>,
        cache: Arc<dyn LibraryCache>,
        events: EventBus,
    ) -> Self {
        let state = Arc::new(DiscoveryStateHolder::new());

        let pipeline = MetadataExtractionPipeline::new(
            config.pipeline.clone(),
            tag_reader,
            Arc::clone(&artwork),
            Arc::clone(&media_index),
            events.clone(),
            Arc::clone(&state),
        );
        let reconciler = LibraryReconciler::new(artwork, Arc::clone(&media_index))
            .with_thumbnail_size(config.album_thumbnail_size);

        Self {
            config,
            media_index,
            cache,
            pipeline,
            reconciler,
            events,
            state,
            run_lock: Mutex::new(()),
            active: std::sync::Mutex::new(None),
        }
    }

    /// Read-only view of the discovery state.
    pub fn state(&self) -> DiscoveryStateWatcher {
        self.state.watch()
    }

    pub fn current_state(&self) -> DiscoveryState {
        self.state.current()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// `sync(false)`
    pub async fn sync_if_changed(&self) -> DiscoveryResult {
        self.sync(false).await
    }

    /// Rebuild the library from the media index.
    ///
    /// Without `force`, returns a skipped result when the stored and current
    /// generations are both known and equal.
    pub async fn sync(&self, force: bool) -> DiscoveryResult {
        let _run = self.run_lock.lock().await;
        let run_id = RunId::new();
        let span = info_span!("sync", run_id = %run_id, force);

        self.run(run_id, force, false).instrument(span).await
    }

    /// Rescan every media index root, then run a forced sync.
    pub async fn full_scan_and_sync(&self) -> DiscoveryResult {
        let _run = self.run_lock.lock().await;
        let run_id = RunId::new();
        let span = info_span!("full_scan", run_id = %run_id);

        self.run(run_id, true, true).instrument(span).await
    }

    /// Cancel the run in progress. Returns `false` if nothing is running.
    pub fn cancel(&self) -> bool {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        match active.as_ref() {
            Some(token) => {
                info!("Cancelling sync run");
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn set_active(&self, token: Option<CancellationToken>) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn emit(&self, event: SyncEvent) {
        self.events.emit(CoreEvent::Sync(event)).ok();
    }

    /// Caller holds `run_lock`.
    async fn run(&self, run_id: RunId, force: bool, rescan: bool) -> DiscoveryResult {
        let token = CancellationToken::new();
        self.set_active(Some(token.clone()));
        let started = Instant::now();

        self.emit(SyncEvent::Started {
            run_id: run_id.to_string(),
            forced: force,
        });

        let work = async {
            if rescan {
                self.rescan_roots(&token).await?;
            }
            self.execute(force, &token).await
        };

        let outcome = match self.config.run_timeout {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(outcome) => outcome,
                Err(_) => Err(SyncError::Timeout(limit)),
            },
            None => work.await,
        };

        self.set_active(None);

        self.finish(run_id, outcome, started.elapsed())
    }

    fn finish(&self, run_id: RunId, outcome: Result<Outcome>, elapsed: Duration) -> DiscoveryResult {
        let run = run_id.to_string();

        match outcome {
            Ok(Outcome::Skipped { generation }) => {
                info!(generation, "Media index unchanged, skipping sync");
                self.emit(SyncEvent::Skipped {
                    run_id: run,
                    generation,
                });
                DiscoveryResult::skipped(run_id)
            }
            Ok(Outcome::Committed { tracks, albums }) => {
                let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                info!(
                    tracks = tracks.len(),
                    albums = albums.len(),
                    duration_ms,
                    "Sync completed"
                );
                self.emit(SyncEvent::Completed {
                    run_id: run,
                    tracks: tracks.len() as u64,
                    albums: albums.len() as u64,
                    duration_ms,
                });
                self.events
                    .emit(CoreEvent::Library(LibraryEvent::LibraryReplaced {
                        tracks: tracks.len() as u64,
                        albums: albums.len() as u64,
                    }))
                    .ok();
                DiscoveryResult::completed(run_id, tracks, albums)
            }
            Err(SyncError::Cancelled) => {
                warn!("Sync cancelled, library left unchanged");
                self.emit(SyncEvent::Cancelled { run_id: run });
                DiscoveryResult::failed(run_id, &SyncError::Cancelled)
            }
            Err(e) => {
                error!(error = %e, "Sync failed, library left unchanged");
                self.emit(SyncEvent::Failed {
                    run_id: run,
                    message: e.to_string(),
                });
                DiscoveryResult::failed(run_id, &e)
            }
        }
    }

    async fn execute(&self, force: bool, token: &CancellationToken) -> Result<Outcome> {
        let last = match self.cache.last_generation().await {
            Ok(generation) => generation,
            Err(e) => {
                warn!(error = %e, "Could not read stored generation");
                None
            }
        };
        let current = self.media_index.current_generation().await;
        debug!(?last, ?current, "Generation check");

        if !force {
            if let (Some(last), Some(current)) = (last, current) {
                if last == current {
                    return Ok(Outcome::Skipped {
                        generation: current,
                    });
                }
            }
        }

        let _rebuilding = self.state.enter(DiscoveryState::Rebuilding {
            current: 0,
            total: 1,
        });

        info!("Phase 1: Enumerating audio files");
        let files = until_cancelled(token, self.media_index.enumerate_audio_files()).await??;
        info!(files = files.len(), "Enumerated audio files");

        info!("Phase 2: Extracting metadata");
        let metadata = self.pipeline.extract(&files, token).await?;

        info!("Phase 3: Reconciling library");
        let (tracks, albums) = until_cancelled(token, self.reconciler.reconcile(&files, metadata)).await?;

        if token.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        info!("Phase 4: Committing library");
        self.cache.commit_library(&tracks, &albums, current).await?;

        Ok(Outcome::Committed { tracks, albums })
    }

    async fn rescan_roots(&self, token: &CancellationToken) -> Result<()> {
        for root in self.media_index.roots() {
            if token.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            match until_cancelled(token, self.rescan_root(&root)).await? {
                Ok(files) => {
                    info!(root = %root.display(), files, "Rescan completed");
                    self.events
                        .emit(CoreEvent::Discovery(DiscoveryEvent::RescanCompleted {
                            root: root.display().to_string(),
                            files: files as u64,
                        }))
                        .ok();
                }
                Err(e) => warn!(root = %root.display(), error = %e, "Rescan failed, continuing"),
            }
        }
        Ok(())
    }

    /// Returns the number of files the index visited.
    async fn rescan_root(&self, root: &Path) -> Result<usize> {
        let _scanning = self.state.enter(DiscoveryState::Scanning {
            current: 0,
            total: 1,
        });
        let total_files = AtomicUsize::new(0);
        let state = &self.state;

        let on_progress = |progress: RescanProgress| {
            let RescanProgress { completed, total } = progress;
            total_files.store(total, Ordering::SeqCst);
            if total == 0 {
                return;
            }

            if completed == 0 {
                state.set(DiscoveryState::Scanning { current: 0, total });
            } else if completed.is_multiple_of(SCAN_PROGRESS_INTERVAL) || completed == total {
                state.advance(DiscoveryState::Scanning {
                    current: completed,
                    total,
                });
            }
        };

        self.media_index.request_rescan(root, &on_progress).await?;
        Ok(total_files.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
        assert_eq!(RunId::new().to_string().len(), 36);
    }

    #[test]
    fn test_sync_config_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.album_thumbnail_size, 128);
        assert_eq!(config.pipeline.preview_size, 384);
        assert!(config.run_timeout.is_none());

        let config = config.with_run_timeout(Duration::from_secs(5));
        assert_eq!(config.run_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_cancelled_result_message() {
        let result = DiscoveryResult::failed(RunId::new(), &SyncError::Cancelled);
        assert_eq!(result.error.as_deref(), Some("Discovery cancelled"));
        assert!(!result.skipped);
        assert!(!result.is_success());
    }
}
