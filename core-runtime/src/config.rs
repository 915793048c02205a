//! # Core Configuration
//!
//! [`CoreConfig`] collects everything needed to bring up the library engine:
//! where the database lives, which directories hold music, how much
//! concurrency discovery may use and, optionally, host-supplied bridge
//! implementations.
//!
//! ## Usage
//!
//! ```no_run
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/home/me/.local/share/library/library.db")
//!     .music_root("/home/me/Music")
//!     .max_concurrency(8)
//!     .build()
//!     .expect("valid configuration");
//! ```
//!
//! Bridges left unset are resolved by `core-service`: desktop builds use the
//! filesystem media index and the lofty-based tag and artwork readers, other
//! builds fail with [`Error::CapabilityMissing`].

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{ArtworkExtractor, MediaIndex, TagReader};
use std::path::PathBuf;
use std::sync::Arc;

/// Extensions treated as audio when no list is configured.
pub const DEFAULT_AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "m4a", "aac", "ogg", "opus", "wav", "wma", "aiff", "alac",
];

/// Edge length of the artwork attached to discovery previews.
pub const DEFAULT_PREVIEW_THUMBNAIL_SIZE: u32 = 384;

/// Edge length requested for stored album thumbnails.
pub const DEFAULT_ALBUM_THUMBNAIL_SIZE: u32 = 128;

/// Files per progress batch during a media index rescan.
pub const DEFAULT_RESCAN_BATCH_SIZE: usize = 100;

/// Four tasks per available core.
pub fn default_max_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        * 4
}

/// Core configuration. Construct with [`CoreConfig::builder`].
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Directories scanned for music
    pub music_roots: Vec<PathBuf>,

    /// Lower-case file extensions (without the dot) treated as audio
    pub audio_extensions: Vec<String>,

    /// Upper bound on concurrently processed files during discovery
    pub max_concurrency: usize,

    pub preview_thumbnail_size: u32,

    pub album_thumbnail_size: u32,

    pub rescan_batch_size: usize,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,

    pub media_index: Option<Arc<dyn MediaIndex>>,

    pub tag_reader: Option<Arc<dyn TagReader>>,

    pub artwork_extractor: Option<Arc<dyn ArtworkExtractor>>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("music_roots", &self.music_roots)
            .field("audio_extensions", &self.audio_extensions)
            .field("max_concurrency", &self.max_concurrency)
            .field("preview_thumbnail_size", &self.preview_thumbnail_size)
            .field("album_thumbnail_size", &self.album_thumbnail_size)
            .field("rescan_batch_size", &self.rescan_batch_size)
            .field("event_buffer_size", &self.event_buffer_size)
            .field(
                "media_index",
                &self.media_index.as_ref().map(|_| "MediaIndex { ... }"),
            )
            .field(
                "tag_reader",
                &self.tag_reader.as_ref().map(|_| "TagReader { ... }"),
            )
            .field(
                "artwork_extractor",
                &self
                    .artwork_extractor
                    .as_ref()
                    .map(|_| "ArtworkExtractor { ... }"),
            )
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// This checks:
    /// - Database path is not empty
    /// - At least one music root is configured
    /// - At least one audio extension is configured
    /// - Concurrency, thumbnail sizes, batch size and buffer size are non-zero
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.music_roots.is_empty() {
            return Err(Error::Config(
                "At least one music root is required. Use .music_root() to add one.".to_string(),
            ));
        }

        if self
            .music_roots
            .iter()
            .any(|root| root.as_os_str().is_empty())
        {
            return Err(Error::Config("Music roots cannot be empty paths".to_string()));
        }

        if self.audio_extensions.is_empty() {
            return Err(Error::Config(
                "Audio extension list cannot be empty".to_string(),
            ));
        }

        if self.max_concurrency == 0 {
            return Err(Error::Config(
                "max_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.preview_thumbnail_size == 0 || self.album_thumbnail_size == 0 {
            return Err(Error::Config(
                "Thumbnail sizes must be greater than 0".to_string(),
            ));
        }

        if self.rescan_batch_size == 0 {
            return Err(Error::Config(
                "rescan_batch_size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "event_buffer_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    music_roots: Vec<PathBuf>,
    audio_extensions: Option<Vec<String>>,
    max_concurrency: Option<usize>,
    preview_thumbnail_size: Option<u32>,
    album_thumbnail_size: Option<u32>,
    rescan_batch_size: Option<usize>,
    event_buffer_size: Option<usize>,
    media_index: Option<Arc<dyn MediaIndex>>,
    tag_reader: Option<Arc<dyn TagReader>>,
    artwork_extractor: Option<Arc<dyn ArtworkExtractor>>,
}

impl CoreConfigBuilder {
    /// Sets the database path. Required.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Adds a music root. At least one is required.
    pub fn music_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.music_roots.push(path.into());
        self
    }

    pub fn music_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.music_roots.extend(roots.into_iter().map(Into::into));
        self
    }

    /// Replaces the default audio extension list.
    ///
    /// Leading dots are stripped and values lower-cased.
    pub fn audio_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.audio_extensions = Some(
            extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
        );
        self
    }

    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max);
        self
    }

    pub fn preview_thumbnail_size(mut self, size: u32) -> Self {
        self.preview_thumbnail_size = Some(size);
        self
    }

    pub fn album_thumbnail_size(mut self, size: u32) -> Self {
        self.album_thumbnail_size = Some(size);
        self
    }

    pub fn rescan_batch_size(mut self, size: usize) -> Self {
        self.rescan_batch_size = Some(size);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Injects a host media index instead of the desktop default.
    pub fn media_index(mut self, index: Arc<dyn MediaIndex>) -> Self {
        self.media_index = Some(index);
        self
    }

    pub fn tag_reader(mut self, reader: Arc<dyn TagReader>) -> Self {
        self.tag_reader = Some(reader);
        self
    }

    pub fn artwork_extractor(mut self, extractor: Arc<dyn ArtworkExtractor>) -> Self {
        self.artwork_extractor = Some(extractor);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// `Error::Config` when a required field is missing or a value is out of
    /// range.
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let config = CoreConfig {
            database_path,
            music_roots: self.music_roots,
            audio_extensions: self.audio_extensions.unwrap_or_else(|| {
                DEFAULT_AUDIO_EXTENSIONS
                    .iter()
                    .map(|ext| ext.to_string())
                    .collect()
            }),
            max_concurrency: self
                .max_concurrency
                .unwrap_or_else(default_max_concurrency),
            preview_thumbnail_size: self
                .preview_thumbnail_size
                .unwrap_or(DEFAULT_PREVIEW_THUMBNAIL_SIZE),
            album_thumbnail_size: self
                .album_thumbnail_size
                .unwrap_or(DEFAULT_ALBUM_THUMBNAIL_SIZE),
            rescan_batch_size: self.rescan_batch_size.unwrap_or(DEFAULT_RESCAN_BATCH_SIZE),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            media_index: self.media_index,
            tag_reader: self.tag_reader,
            artwork_extractor: self.artwork_extractor,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> CoreConfigBuilder {
        CoreConfig::builder()
            .database_path("/tmp/library.db")
            .music_root("/tmp/music")
    }

    #[test]
    fn test_defaults() {
        let config = minimal().build().unwrap();

        assert_eq!(config.audio_extensions.len(), DEFAULT_AUDIO_EXTENSIONS.len());
        assert!(config.audio_extensions.contains(&"flac".to_string()));
        assert_eq!(config.max_concurrency, default_max_concurrency());
        assert_eq!(config.preview_thumbnail_size, 384);
        assert_eq!(config.album_thumbnail_size, 128);
        assert_eq!(config.rescan_batch_size, 100);
        assert_eq!(config.event_buffer_size, 100);
        assert!(config.media_index.is_none());
    }

    #[test]
    fn test_missing_database_path() {
        let result = CoreConfig::builder().music_root("/tmp/music").build();

        match result {
            Err(Error::Config(msg)) => assert!(msg.contains("database_path")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_music_root() {
        let result = CoreConfig::builder().database_path("/tmp/db").build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("music root")));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(minimal().max_concurrency(0).build().is_err());
        assert!(minimal().rescan_batch_size(0).build().is_err());
        assert!(minimal().album_thumbnail_size(0).build().is_err());
    }

    #[test]
    fn test_extension_normalization() {
        let config = minimal()
            .audio_extensions([".MP3", "Flac", ""])
            .build()
            .unwrap();

        assert_eq!(config.audio_extensions, vec!["mp3", "flac"]);
    }

    #[test]
    fn test_empty_extension_list_rejected() {
        let result = minimal().audio_extensions(Vec::<String>::new()).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = minimal().music_roots(["/a", "/b"]).build().unwrap();
        let debug = format!("{:?}", config);

        assert!(debug.contains("music_roots"));
        assert!(debug.contains("media_index: None"));
        assert_eq!(config.music_roots.len(), 3);
    }
}
