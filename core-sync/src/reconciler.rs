//! Folds per-file metadata into the library's track and album sets.
//!
//! Albums are keyed by [`album_id`]. The first track seen for an album
//! decides its thumbnail, palette and album-level ReplayGain; later tracks of
//! the same album only add a track row.

use bridge_traits::{ArtworkExtractor, MediaIndex, RawFileRef};
use core_library::models::{album_id, Album, Track};
use core_metadata::{encode_thumbnail, generate_palette, TrackMetadata};
use core_runtime::config::DEFAULT_ALBUM_THUMBNAIL_SIZE;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct LibraryReconciler {
    artwork: Arc<dyn ArtworkExtractor>,
    media_index: Arc<dyn MediaIndex>,
    thumbnail_size: u32,
}

impl LibraryReconciler {
    pub fn new(artwork: Arc<dyn ArtworkExtractor>, media_index: Arc<dyn MediaIndex>) -> Self {
        Self {
            artwork,
            media_index,
            thumbnail_size: DEFAULT_ALBUM_THUMBNAIL_SIZE,
        }
    }

    pub fn with_thumbnail_size(mut self, size: u32) -> Self {
        self.thumbnail_size = size;
        self
    }

    /// Build tracks and albums. `results[i]` must describe `files[i]`.
    ///
    /// Tracks keep input order and albums keep first-seen order. Every track
    /// starts as a non-favorite; the cache write restores favorites.
    #[instrument(skip_all, fields(tracks = results.len()))]
    pub async fn reconcile(
        &self,
        files: &[RawFileRef],
        results: Vec<TrackMetadata>,
    ) -> (Vec<Track>, Vec<Album>) {
        let mut seen = HashSet::new();
        let mut albums = Vec::new();
        let mut tracks = Vec::with_capacity(results.len());

        for (file, metadata) in files.iter().zip(results) {
            let id = album_id(&metadata.artist, &metadata.album_name);
            let uri = self.media_index.content_ref(file);

            if seen.insert(id.clone()) {
                albums.push(self.build_album(id.clone(), &uri, &metadata).await);
            }

            tracks.push(Track {
                id: metadata.id,
                title: metadata.title,
                artist: metadata.artist,
                album: metadata.album_name,
                album_id: id,
                duration_ms: metadata.duration_ms,
                uri,
                disc_number: metadata.disc_number,
                track_number: metadata.track_number,
                is_favorite: false,
                lyrics: metadata.lyrics,
                track_gain: metadata.track_gain,
                track_peak: metadata.track_peak,
            });
        }

        info!(tracks = tracks.len(), albums = albums.len(), "Library reconciled");
        (tracks, albums)
    }

    async fn build_album(&self, id: String, content_ref: &str, first: &TrackMetadata) -> Album {
        let mut album = Album {
            id,
            name: first.album_name.clone(),
            artist: first.artist.clone(),
            thumbnail: None,
            palette: None,
            album_gain: first.album_gain,
            album_peak: first.album_peak,
        };

        let artwork = match self
            .artwork
            .extract_artwork(content_ref, self.thumbnail_size)
            .await
        {
            Ok(artwork) => artwork,
            Err(e) => {
                debug!(album = %album.id, error = %e, "Thumbnail artwork failed");
                None
            }
        };

        if let Some(artwork) = artwork {
            let palette = generate_palette(&artwork);
            album.palette = (!palette.is_empty()).then_some(palette);

            match encode_thumbnail(&artwork) {
                Ok(bytes) => album.thumbnail = Some(bytes),
                Err(e) => warn!(album = %album.id, error = %e, "Failed to encode thumbnail"),
            }
        }

        album
    }
}
