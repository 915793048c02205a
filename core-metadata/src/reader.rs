//! Audio tag reading with `lofty`
//!
//! Supports ID3v2, Vorbis Comments, MP4 ilst, APE and RIFF INFO tags. Items
//! lofty knows are stored under the canonical names in
//! [`bridge_traits::tags::keys`]; everything else keeps the key used by the
//! file's own tag format, so fields such as `UNSYNCEDLYRICS` stay reachable.

use async_trait::async_trait;
use bridge_traits::tags::{keys, RawTags, TagReader};
use lofty::config::ParseOptions;
use lofty::error::{ErrorKind, LoftyError};
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::error::{MetadataError, Result};

/// [`TagReader`] backed by `lofty`. Parsing runs on the blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct LoftyTagReader {
    parse_options: ParseOptions,
}

impl LoftyTagReader {
    pub fn new() -> Self {
        Self {
            parse_options: ParseOptions::new(),
        }
    }

    pub fn with_options(parse_options: ParseOptions) -> Self {
        Self { parse_options }
    }

    /// Read tags synchronously.
    pub fn read_blocking(&self, path: &Path) -> Result<RawTags> {
        if !path.exists() {
            return Err(MetadataError::FileNotFound(path.display().to_string()));
        }

        let probe = Probe::open(path)
            .map_err(|e| map_lofty_error(path, e))?
            .options(self.parse_options)
            .guess_file_type()?;
        let tagged_file = probe.read().map_err(|e| map_lofty_error(path, e))?;

        let mut raw = RawTags::new()
            .with_duration_ms(tagged_file.properties().duration().as_millis() as u64);

        // Primary tag first so its values win over secondary tags
        let primary = tagged_file.primary_tag_type();
        let mut tags: Vec<&Tag> = tagged_file.tags().iter().collect();
        tags.sort_by_key(|tag| tag.tag_type() != primary);

        for tag in tags {
            collect_items(tag, &mut raw);
        }

        debug!(fields = raw.len(), "Read tags");
        Ok(raw)
    }
}

impl Default for LoftyTagReader {
    fn default() -> Self {
        Self::new()
    }
}

fn canonical_key(key: &ItemKey) -> Option<&'static str> {
    let name = match key {
        ItemKey::TrackTitle => keys::TITLE,
        ItemKey::TrackArtist => keys::ARTIST,
        ItemKey::AlbumTitle => keys::ALBUM,
        ItemKey::TrackNumber => keys::TRACK_NUMBER,
        ItemKey::DiscNumber => keys::DISC_NUMBER,
        ItemKey::Lyrics => keys::LYRICS,
        ItemKey::ReplayGainTrackGain => keys::REPLAYGAIN_TRACK_GAIN,
        ItemKey::ReplayGainTrackPeak => keys::REPLAYGAIN_TRACK_PEAK,
        ItemKey::ReplayGainAlbumGain => keys::REPLAYGAIN_ALBUM_GAIN,
        ItemKey::ReplayGainAlbumPeak => keys::REPLAYGAIN_ALBUM_PEAK,
        _ => return None,
    };
    Some(name)
}

fn collect_items(tag: &Tag, raw: &mut RawTags) {
    for item in tag.items() {
        let Some(value) = item.value().text() else {
            continue;
        };

        let key = match canonical_key(item.key()) {
            Some(name) => name.to_string(),
            None => match item.key() {
                ItemKey::Unknown(name) => name.clone(),
                other => match other.map_key(tag.tag_type(), true) {
                    Some(name) => name.to_string(),
                    None => continue,
                },
            },
        };

        raw.insert(key, value);
    }
}

fn map_lofty_error(path: &Path, err: LoftyError) -> MetadataError {
    match err.kind() {
        ErrorKind::UnknownFormat => MetadataError::UnsupportedFormat(path.display().to_string()),
        _ => MetadataError::ExtractionFailed(format!("{}: {}", path.display(), err)),
    }
}

#[async_trait]
impl TagReader for LoftyTagReader {
    #[instrument(skip(self), fields(file = %core_runtime::logging::display_file_name(path)))]
    async fn read_tags(&self, path: &Path) -> bridge_traits::error::Result<RawTags> {
        let reader = *self;
        let path: PathBuf = path.to_path_buf();

        let result = tokio::task::spawn_blocking(move || reader.read_blocking(&path))
            .await
            .map_err(|e| MetadataError::ExtractionFailed(format!("tag reader task failed: {}", e)))?;

        Ok(result?)
    }
}
