//! Core service façade and bootstrap helpers.
//!
//! This crate wires the configuration, the bridges and the SQLite library
//! into one [`LibraryService`] handle. Desktop apps enable the
//! `desktop-shims` feature (the default), which fills unset bridges with the
//! filesystem media index and the lofty-based tag and artwork readers. Hosts
//! that provide every bridge themselves can disable it.
//!
//! ```no_run
//! # async fn example() -> core_service::Result<()> {
//! use core_runtime::config::CoreConfig;
//! use core_service::LibraryService;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/home/me/.local/share/library/library.db")
//!     .music_root("/home/me/Music")
//!     .build()?;
//!
//! let service = LibraryService::builder(config).build().await?;
//! let result = service.sync_if_changed().await;
//! println!("{} tracks", result.tracks.len());
//! # Ok(())
//! # }
//! ```

mod bridges;
pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use core_library::db::{self, DatabaseConfig};
use core_library::models::{Album, ArtistSummary, Track, TrackQueueItem};
use core_library::repositories::{
    AlbumRepository, ArtistRepository, Page, PageRequest, SqliteAlbumRepository,
    SqliteArtistRepository, SqliteTrackRepository, TrackRepository,
};
use core_library::settings::{keys, ReplayGainMode, Settings, SettingsRepository};
use core_library::SqliteLibraryCache;
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream, LibraryEvent, Receiver};
use core_runtime::DiscoveryStateWatcher;
use core_sync::{DiscoveryResult, SyncConfig, SyncCoordinator};
use sqlx::SqlitePool;
use tracing::{info, instrument};

use crate::bridges::Bridges;

/// Builder for [`LibraryService`].
pub struct LibraryServiceBuilder {
    config: CoreConfig,
    sync_config: Option<SyncConfig>,
    pool: Option<SqlitePool>,
}

impl LibraryServiceBuilder {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            sync_config: None,
            pool: None,
        }
    }

    /// Replaces the sync settings derived from the core configuration.
    pub fn sync_config(mut self, sync_config: SyncConfig) -> Self {
        self.sync_config = Some(sync_config);
        self
    }

    /// Use an existing, migrated pool instead of opening `database_path`.
    pub fn pool(mut self, pool: SqlitePool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Resolves bridges, opens the database and assembles the service.
    ///
    /// # Errors
    ///
    /// - `CoreError::Runtime` if the configuration is invalid
    /// - `CoreError::CapabilityMissing` if a bridge is unset and no default
    ///   is compiled in
    /// - `CoreError::InitializationFailed` if the database cannot be opened
    pub async fn build(self) -> Result<LibraryService> {
        self.config.validate()?;
        let bridges = Bridges::resolve(&self.config)?;

        let pool = match self.pool {
            Some(pool) => pool,
            None => db::create_pool(DatabaseConfig::new(&self.config.database_path))
                .await
                .map_err(|e| {
                    CoreError::InitializationFailed(format!(
                        "Failed to open library database {}: {}",
                        self.config.database_path.display(),
                        e
                    ))
                })?,
        };

        let events = EventBus::new(self.config.event_buffer_size);
        let cache = Arc::new(SqliteLibraryCache::new(pool.clone()));
        let sync_config = self
            .sync_config
            .unwrap_or_else(|| SyncConfig::from_core_config(&self.config));

        let coordinator = SyncCoordinator::new(
            sync_config,
            bridges.media_index,
            bridges.tag_reader,
            bridges.artwork,
            cache.clone(),
            events.clone(),
        );

        info!(
            roots = self.config.music_roots.len(),
            database = %self.config.database_path.display(),
            "Library service ready"
        );

        Ok(LibraryService {
            inner: Arc::new(Inner {
                config: self.config,
                pool: pool.clone(),
                coordinator,
                tracks: SqliteTrackRepository::new(pool.clone()),
                albums: SqliteAlbumRepository::new(pool.clone()),
                artists: SqliteArtistRepository::new(pool),
                settings: SettingsRepository::new(cache),
                events,
            }),
        })
    }
}

struct Inner {
    config: CoreConfig,
    pool: SqlitePool,
    coordinator: SyncCoordinator,
    tracks: SqliteTrackRepository,
    albums: SqliteAlbumRepository,
    artists: SqliteArtistRepository,
    settings: SettingsRepository,
    events: EventBus,
}

/// Primary façade exposed to host applications. Cloning shares the service.
#[derive(Clone)]
pub struct LibraryService {
    inner: Arc<Inner>,
}

impl LibraryService {
    pub fn builder(config: CoreConfig) -> LibraryServiceBuilder {
        LibraryServiceBuilder::new(config)
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }

    pub async fn health_check(&self) -> Result<()> {
        Ok(db::health_check(&self.inner.pool).await?)
    }

    fn emit(&self, event: LibraryEvent) {
        self.inner.events.emit(CoreEvent::Library(event)).ok();
    }

    // ------------------------------------------------------------------
    // Discovery
    // ------------------------------------------------------------------

    /// Rebuild the library unless the media index generation is unchanged.
    pub async fn sync_if_changed(&self) -> DiscoveryResult {
        self.inner.coordinator.sync_if_changed().await
    }

    /// Rebuild the library regardless of the generation.
    pub async fn force_sync(&self) -> DiscoveryResult {
        self.inner.coordinator.sync(true).await
    }

    /// Rescan every music root, then rebuild.
    pub async fn full_scan_and_sync(&self) -> DiscoveryResult {
        self.inner.coordinator.full_scan_and_sync().await
    }

    /// Returns `false` when no sync is running.
    pub fn cancel_sync(&self) -> bool {
        self.inner.coordinator.cancel()
    }

    pub fn discovery_state(&self) -> DiscoveryStateWatcher {
        self.inner.coordinator.state()
    }

    pub fn subscribe_events(&self) -> Receiver<CoreEvent> {
        self.inner.events.subscribe()
    }

    pub fn subscribe_previews(&self) -> EventStream {
        self.inner.events.subscribe_previews()
    }

    // ------------------------------------------------------------------
    // Tracks
    // ------------------------------------------------------------------

    pub async fn tracks(&self) -> Result<Vec<Track>> {
        Ok(self.inner.tracks.get_tracks().await?)
    }

    pub async fn tracks_paged(&self, request: PageRequest) -> Result<Page<Track>> {
        Ok(self.inner.tracks.get_tracks_paged(request).await?)
    }

    pub async fn track(&self, id: i64) -> Result<Option<Track>> {
        Ok(self.inner.tracks.get_track(id).await?)
    }

    pub async fn album_tracks(&self, album_id: &str) -> Result<Vec<Track>> {
        Ok(self.inner.tracks.get_tracks_by_album(album_id).await?)
    }

    pub async fn album_tracks_paged(
        &self,
        album_id: &str,
        request: PageRequest,
    ) -> Result<Page<Track>> {
        Ok(self
            .inner
            .tracks
            .get_tracks_by_album_paged(album_id, request)
            .await?)
    }

    pub async fn queue_items(&self) -> Result<Vec<TrackQueueItem>> {
        Ok(self.inner.tracks.get_queue_items().await?)
    }

    pub async fn album_queue_items(&self, album_id: &str) -> Result<Vec<TrackQueueItem>> {
        Ok(self.inner.tracks.get_album_queue_items(album_id).await?)
    }

    /// Keyset page of queue items after `(title, id)`.
    pub async fn queue_items_after(
        &self,
        title: &str,
        id: i64,
        limit: u32,
    ) -> Result<Vec<TrackQueueItem>> {
        Ok(self.inner.tracks.get_queue_items_after(title, id, limit).await?)
    }

    pub async fn favorites(&self) -> Result<Vec<Track>> {
        Ok(self.inner.tracks.get_favorites().await?)
    }

    pub async fn track_count(&self) -> Result<i64> {
        Ok(self.inner.tracks.count().await?)
    }

    /// Flip a track's favorite flag and return the new value.
    #[instrument(skip(self))]
    pub async fn toggle_favorite(&self, track_id: i64) -> Result<bool> {
        let is_favorite = self.inner.tracks.toggle_favorite(track_id).await?;
        self.emit(LibraryEvent::FavoriteChanged {
            track_id,
            is_favorite,
        });
        Ok(is_favorite)
    }

    #[instrument(skip(self))]
    pub async fn set_favorite(&self, track_id: i64, is_favorite: bool) -> Result<()> {
        self.inner.tracks.set_favorite(track_id, is_favorite).await?;
        self.emit(LibraryEvent::FavoriteChanged {
            track_id,
            is_favorite,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Albums and artists
    // ------------------------------------------------------------------

    pub async fn albums(&self) -> Result<Vec<Album>> {
        Ok(self.inner.albums.get_albums().await?)
    }

    pub async fn albums_paged(&self, request: PageRequest) -> Result<Page<Album>> {
        Ok(self.inner.albums.get_albums_paged(request).await?)
    }

    pub async fn album(&self, id: &str) -> Result<Option<Album>> {
        Ok(self.inner.albums.get_album(id).await?)
    }

    pub async fn artist_albums(&self, artist: &str) -> Result<Vec<Album>> {
        Ok(self.inner.albums.get_albums_by_artist(artist).await?)
    }

    pub async fn artist_albums_paged(
        &self,
        artist: &str,
        request: PageRequest,
    ) -> Result<Page<Album>> {
        Ok(self
            .inner
            .albums
            .get_albums_by_artist_paged(artist, request)
            .await?)
    }

    pub async fn album_count(&self) -> Result<i64> {
        Ok(self.inner.albums.count().await?)
    }

    pub async fn artists(&self) -> Result<Vec<String>> {
        Ok(self.inner.artists.get_artists().await?)
    }

    pub async fn artists_paged(&self, request: PageRequest) -> Result<Page<String>> {
        Ok(self.inner.artists.get_artists_paged(request).await?)
    }

    pub async fn artist_summaries(&self) -> Result<Vec<ArtistSummary>> {
        Ok(self.inner.artists.get_artist_summaries().await?)
    }

    pub async fn artist_summaries_paged(
        &self,
        request: PageRequest,
    ) -> Result<Page<ArtistSummary>> {
        Ok(self.inner.artists.get_artist_summaries_paged(request).await?)
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub async fn settings(&self) -> Result<Settings> {
        Ok(self.inner.settings.load().await?)
    }

    pub async fn set_onboarding_completed(&self, completed: bool) -> Result<()> {
        self.inner.settings.set_onboarding_completed(completed).await?;
        self.settings_changed(keys::ONBOARDING_COMPLETED);
        Ok(())
    }

    pub async fn set_lyrics_offset_ms(&self, offset: i64) -> Result<()> {
        self.inner.settings.set_lyrics_offset_ms(offset).await?;
        self.settings_changed(keys::LYRICS_OFFSET);
        Ok(())
    }

    pub async fn set_replay_gain_mode(&self, mode: ReplayGainMode) -> Result<()> {
        self.inner.settings.set_replay_gain_mode(mode).await?;
        self.settings_changed(keys::REPLAY_GAIN_MODE);
        Ok(())
    }

    /// # Errors
    /// `LibraryError::InvalidInput` for a non-finite gain.
    pub async fn set_replay_gain_preamp(&self, gain: f32) -> Result<()> {
        self.inner.settings.set_replay_gain_preamp(gain).await?;
        self.settings_changed(keys::REPLAY_GAIN_PREAMP);
        Ok(())
    }

    pub async fn set_lyrics_blank_line_interval_ms(&self, interval: i64) -> Result<()> {
        self.inner
            .settings
            .set_lyrics_blank_line_interval_ms(interval)
            .await?;
        self.settings_changed(keys::LYRICS_BLANK_LINE_INTERVAL);
        Ok(())
    }

    fn settings_changed(&self, key: &str) {
        self.emit(LibraryEvent::SettingsChanged {
            key: key.to_string(),
        });
    }
}
