//! LibraryService wiring: bridges, queries, favorites and settings.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::media::{GenerationOracle, MediaIndex, RawFileRef, RescanProgress};
use bridge_traits::tags::keys;
use bridge_traits::{ArtworkExtractor, DecodedArtwork, RawTags, TagReader};
use core_library::db::create_test_pool;
use core_library::repositories::PageRequest;
use core_library::settings::{ReplayGainMode, DEFAULT_LYRICS_OFFSET_MS};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, LibraryEvent};
use core_service::{CoreError, LibraryService};
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct StaticIndex {
    files: Vec<RawFileRef>,
}

#[async_trait]
impl GenerationOracle for StaticIndex {
    async fn current_generation(&self) -> Option<i64> {
        Some(1)
    }
}

#[async_trait]
impl MediaIndex for StaticIndex {
    async fn enumerate_audio_files(&self) -> BridgeResult<Vec<RawFileRef>> {
        Ok(self.files.clone())
    }

    fn content_ref(&self, file: &RawFileRef) -> String {
        format!("static://{}", file.id)
    }

    fn roots(&self) -> Vec<PathBuf> {
        vec![PathBuf::from("/music")]
    }

    async fn request_rescan(
        &self,
        _root: &Path,
        progress: &(dyn Fn(RescanProgress) + Send + Sync),
    ) -> BridgeResult<()> {
        progress(RescanProgress {
            completed: 0,
            total: 0,
        });
        Ok(())
    }
}

/// `/music/<artist>/<album>/<title>.flac`
struct PathTagReader;

#[async_trait]
impl TagReader for PathTagReader {
    async fn read_tags(&self, path: &Path) -> BridgeResult<RawTags> {
        let parts: Vec<String> = path
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let [.., artist, album, file] = parts.as_slice() else {
            return Err(BridgeError::OperationFailed("unexpected layout".to_string()));
        };
        let title = file.trim_end_matches(".flac");

        Ok(RawTags::new()
            .with_field(keys::TITLE, title)
            .with_field(keys::ARTIST, artist.as_str())
            .with_field(keys::ALBUM, album.as_str()))
    }
}

struct NoArtwork;

#[async_trait]
impl ArtworkExtractor for NoArtwork {
    async fn extract_artwork(&self, _: &str, _: u32) -> BridgeResult<Option<DecodedArtwork>> {
        Ok(None)
    }
}

fn library_files() -> Vec<RawFileRef> {
    vec![
        RawFileRef::new(1, "/music/Megadeth/Rust in Peace/Holy Wars.flac"),
        RawFileRef::new(2, "/music/Megadeth/Rust in Peace/Hangar 18.flac"),
        RawFileRef::new(3, "/music/Megadeth/Countdown to Extinction/Symphony of Destruction.flac"),
        RawFileRef::new(4, "/music/Slayer/Reign in Blood/Angel of Death.flac"),
    ]
}

async fn service() -> LibraryService {
    let config = CoreConfig::builder()
        .database_path("unused.db")
        .music_root("/music")
        .media_index(Arc::new(StaticIndex {
            files: library_files(),
        }))
        .tag_reader(Arc::new(PathTagReader))
        .artwork_extractor(Arc::new(NoArtwork))
        .build()
        .unwrap();

    LibraryService::builder(config)
        .pool(create_test_pool().await.unwrap())
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_sync_then_query() {
    let service = service().await;

    let result = service.sync_if_changed().await;
    assert!(result.is_success());
    assert_eq!(service.track_count().await.unwrap(), 4);
    assert_eq!(service.album_count().await.unwrap(), 3);

    let album = service.album("Megadeth|Rust in Peace").await.unwrap().unwrap();
    assert_eq!(album.name, "Rust in Peace");
    assert_eq!(service.album_tracks(&album.id).await.unwrap().len(), 2);

    let albums = service.artist_albums("Megadeth").await.unwrap();
    assert_eq!(albums.len(), 2);

    assert_eq!(service.artists().await.unwrap(), vec!["Megadeth", "Slayer"]);

    let page = service.tracks_paged(PageRequest::first(3)).await.unwrap();
    assert_eq!(page.items.len(), 3);
    assert!(page.has_next());

    // Same generation
    assert!(service.sync_if_changed().await.skipped);
    assert!(service.health_check().await.is_ok());
}

#[tokio::test]
async fn test_favorites_emit_events_and_survive_sync() {
    let service = service().await;
    service.force_sync().await;
    let mut events = service.subscribe_events();

    assert!(service.toggle_favorite(4).await.unwrap());
    service.force_sync().await;

    let favorites = service.favorites().await.unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].title, "Angel of Death");

    service.set_favorite(4, false).await.unwrap();
    assert!(service.favorites().await.unwrap().is_empty());

    let mut changes = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Library(LibraryEvent::FavoriteChanged {
            track_id,
            is_favorite,
        }) = event
        {
            changes.push((track_id, is_favorite));
        }
    }
    assert_eq!(changes, vec![(4, true), (4, false)]);
}

#[tokio::test]
async fn test_toggle_unknown_track_fails() {
    let service = service().await;
    let err = service.toggle_favorite(99).await.unwrap_err();
    assert!(matches!(err, CoreError::Library(_)));
}

#[tokio::test]
async fn test_settings_roundtrip() {
    let service = service().await;
    let mut events = service.subscribe_events();

    let defaults = service.settings().await.unwrap();
    assert_eq!(defaults.lyrics_offset_ms, DEFAULT_LYRICS_OFFSET_MS);
    assert_eq!(defaults.replay_gain_mode, ReplayGainMode::None);

    service.set_replay_gain_mode(ReplayGainMode::Album).await.unwrap();
    service.set_lyrics_offset_ms(-250).await.unwrap();
    service.set_onboarding_completed(true).await.unwrap();
    assert!(service.set_replay_gain_preamp(f32::NAN).await.is_err());

    let settings = service.settings().await.unwrap();
    assert_eq!(settings.replay_gain_mode, ReplayGainMode::Album);
    assert_eq!(settings.lyrics_offset_ms, -250);
    assert!(settings.onboarding_completed);

    let mut keys = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Library(LibraryEvent::SettingsChanged { key }) = event {
            keys.push(key);
        }
    }
    assert_eq!(
        keys,
        vec!["replay_gain_mode", "lyrics_offset", "onboarding_completed"]
    );
}

#[tokio::test]
async fn test_cancel_without_sync() {
    let service = service().await;
    assert!(!service.cancel_sync());
    assert!(service.discovery_state().current().is_idle());
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let config = CoreConfig::builder()
        .database_path("unused.db")
        .music_root("/music")
        .build()
        .unwrap();
    let mut config = config;
    config.max_concurrency = 0;

    let result = LibraryService::builder(config).build().await;
    assert!(matches!(result, Err(CoreError::Runtime(_))));
}

#[cfg(feature = "desktop-shims")]
mod desktop {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_desktop_defaults_end_to_end() {
        let root = std::env::temp_dir().join(format!("library-service-{}", uuid::Uuid::new_v4()));
        let music = root.join("Music");
        fs::create_dir_all(music.join("Album")).unwrap();
        // Not real audio: tags fall back to defaults
        fs::write(music.join("Album/First Song.flac"), b"not flac").unwrap();
        fs::write(music.join("Album/Second Song.mp3"), b"not mp3").unwrap();
        fs::write(music.join("Album/cover.jpg"), b"not jpeg").unwrap();

        let config = CoreConfig::builder()
            .database_path(root.join("library.db"))
            .music_root(&music)
            .build()
            .unwrap();
        let service = LibraryService::builder(config).build().await.unwrap();

        let result = service.full_scan_and_sync().await;
        assert!(result.is_success(), "{:?}", result.error);

        let mut titles: Vec<String> = service
            .tracks()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["First Song", "Second Song"]);

        let tracks = service.tracks().await.unwrap();
        assert!(tracks.iter().all(|t| t.uri.starts_with("file://")));
        assert!(tracks.iter().all(|t| t.artist == "Unknown Artist"));

        // Generation recorded, nothing changed on disk
        assert!(service.sync_if_changed().await.skipped);

        let _ = fs::remove_dir_all(&root);
    }
}
