//! # Metadata Extraction Pipeline
//!
//! Fans a file list out to the tag reader, one tokio task per file, and
//! gathers the results back in input order.
//!
//! ## Per-file work
//!
//! 1. Read tags and apply the field rules. A reader failure is logged and the
//!    file gets default metadata (file stem as title).
//! 2. If this is the first file of its album in the run, fetch artwork at
//!    preview size and publish a [`DiscoveryPreview`] with its palette.
//! 3. Bump the shared completion counter; every 10th completion and the last
//!    one publish `Rebuilding(current, total)`.
//!
//! A task that panics contributes default metadata for its slot and never
//! affects its siblings. Cancelling the run aborts every task still running.

use bridge_traits::{ArtworkExtractor, MediaIndex, RawFileRef, TagReader};
use core_library::models::album_id;
use core_metadata::{generate_palette, TrackMetadata};
use core_runtime::config::{default_max_concurrency, DEFAULT_PREVIEW_THUMBNAIL_SIZE};
use core_runtime::events::{CoreEvent, DiscoveryEvent, DiscoveryPreview, EventBus};
use core_runtime::logging::display_file_name;
use core_runtime::{DiscoveryState, DiscoveryStateHolder};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};

/// Completions between two `Rebuilding` updates.
pub const PROGRESS_INTERVAL: usize = 10;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Tasks allowed to run at once
    pub max_concurrency: usize,
    /// Bounding box of preview artwork
    pub preview_size: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            preview_size: DEFAULT_PREVIEW_THUMBNAIL_SIZE,
        }
    }
}

impl PipelineConfig {
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    pub fn with_preview_size(mut self, size: u32) -> Self {
        self.preview_size = size;
        self
    }
}

/// State shared by the tasks of one `extract` call.
struct TaskContext {
    tag_reader: Arc<dyn TagReader>,
    artwork: Arc<dyn ArtworkExtractor>,
    media_index: Arc<dyn MediaIndex>,
    events: EventBus,
    state: Arc<DiscoveryStateHolder>,
    semaphore: Semaphore,
    seen_albums: Mutex<HashSet<String>>,
    completed: AtomicUsize,
    total: usize,
    preview_size: u32,
}

impl TaskContext {
    async fn process(&self, file: RawFileRef) -> TrackMetadata {
        // The semaphore lives as long as the context and is never closed
        let _permit = self.semaphore.acquire().await.ok();

        let metadata = match self.tag_reader.read_tags(&file.path).await {
            Ok(tags) => TrackMetadata::from_tags(&file, &tags),
            Err(e) => {
                warn!(
                    file = %display_file_name(&file.path),
                    error = %e,
                    "Failed to read tags, using defaults"
                );
                TrackMetadata::fallback(&file)
            }
        };

        if self.first_sighting(album_id(&metadata.artist, &metadata.album_name)) {
            self.publish_preview(&file, &metadata.album_name).await;
        }

        let current = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if current.is_multiple_of(PROGRESS_INTERVAL) || current == self.total {
            self.state.advance(DiscoveryState::Rebuilding {
                current,
                total: self.total,
            });
        }

        metadata
    }

    /// True for exactly one caller per album id.
    fn first_sighting(&self, album_id: String) -> bool {
        self.seen_albums
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(album_id)
    }

    async fn publish_preview(&self, file: &RawFileRef, album_name: &str) {
        let content_ref = self.media_index.content_ref(file);

        let image = match self
            .artwork
            .extract_artwork(&content_ref, self.preview_size)
            .await
        {
            Ok(Some(image)) => image,
            Ok(None) => {
                debug!(album = album_name, "No preview artwork");
                return;
            }
            Err(e) => {
                debug!(album = album_name, error = %e, "Preview artwork failed");
                return;
            }
        };

        let palette = generate_palette(&image);
        let preview = DiscoveryPreview {
            name: album_name.to_string(),
            image,
            palette: (!palette.is_empty()).then_some(palette),
        };

        // No subscribers is fine
        self.events
            .emit(CoreEvent::Discovery(DiscoveryEvent::Preview(preview)))
            .ok();
    }
}

/// Aborts every task when the gather ends early or its future is dropped.
struct AbortOnDrop(Vec<JoinHandle<TrackMetadata>>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

pub struct MetadataExtractionPipeline {
    config: PipelineConfig,
    tag_reader: Arc<dyn TagReader>,
    artwork: Arc<dyn ArtworkExtractor>,
    media_index: Arc<dyn MediaIndex>,
    events: EventBus,
    state: Arc<DiscoveryStateHolder>,
}

impl MetadataExtractionPipeline {
    pub fn new(
        config: PipelineConfig,
        tag_reader: Arc<dyn TagReader>,
        artwork: Arc<dyn ArtworkExtractor>,
        media_index: Arc<dyn MediaIndex>,
        events: EventBus,
        state: Arc<DiscoveryStateHolder>,
    ) -> Self {
        Self {
            config,
            tag_reader,
            artwork,
            media_index,
            events,
            state,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract metadata for every file. `result[i]` belongs to `files[i]`.
    ///
    /// # Errors
    ///
    /// `SyncError::Cancelled` if `cancel` fires before every task finished.
    /// Per-file failures are never errors.
    #[instrument(skip_all, fields(files = files.len()))]
    pub async fn extract(
        &self,
        files: &[RawFileRef],
        cancel: &CancellationToken,
    ) -> Result<Vec<TrackMetadata>> {
        let total = files.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let ctx = Arc::new(TaskContext {
            tag_reader: Arc::clone(&self.tag_reader),
            artwork: Arc::clone(&self.artwork),
            media_index: Arc::clone(&self.media_index),
            events: self.events.clone(),
            state: Arc::clone(&self.state),
            semaphore: Semaphore::new(self.config.max_concurrency.max(1)),
            seen_albums: Mutex::new(HashSet::new()),
            completed: AtomicUsize::new(0),
            total,
            preview_size: self.config.preview_size,
        });

        let mut tasks = AbortOnDrop(
            files
                .iter()
                .cloned()
                .map(|file| {
                    let ctx = Arc::clone(&ctx);
                    tokio::spawn(async move { ctx.process(file).await })
                })
                .collect(),
        );

        let mut results = Vec::with_capacity(total);
        for (idx, file) in files.iter().enumerate() {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(completed = ctx.completed.load(Ordering::SeqCst), total, "Extraction cancelled");
                    return Err(SyncError::Cancelled);
                }
                joined = &mut tasks.0[idx] => joined,
            };

            match joined {
                Ok(metadata) => results.push(metadata),
                Err(e) => {
                    warn!(
                        file = %display_file_name(&file.path),
                        error = %e,
                        "Extraction task failed, using defaults"
                    );
                    results.push(TrackMetadata::fallback(file));
                }
            }
        }

        info!(tracks = results.len(), "Metadata extraction complete");
        Ok(results)
    }
}
