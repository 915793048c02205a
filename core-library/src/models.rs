//! Domain models for the music library
//!
//! Tracks and albums are rebuilt wholesale by every successful sync. Their
//! identities are derived from the media index (tracks) and from tag values
//! (albums), never allocated by the database.

use bridge_traits::AlbumPalette;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Separator between artist and album name in an album id.
pub const ALBUM_ID_SEPARATOR: char = '|';

/// Derive the album id for an `(artist, album)` pair.
///
/// Distinct pairs whose concatenation happens to be equal (an artist or album
/// name containing `|`) share an id.
///
/// ```
/// use core_library::models::album_id;
///
/// assert_eq!(album_id("Megadeth", "Rust in Peace"), "Megadeth|Rust in Peace");
/// ```
pub fn album_id(artist: &str, album: &str) -> String {
    format!("{}{}{}", artist, ALBUM_ID_SEPARATOR, album)
}

// =============================================================================
// Track
// =============================================================================

/// A playable file in the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Track {
    /// Media index id of the file
    pub id: i64,
    pub title: String,
    pub artist: String,
    /// Album name as tagged
    pub album: String,
    pub album_id: String,
    pub duration_ms: i64,
    /// Content reference handed out by the media index
    pub uri: String,
    pub disc_number: i32,
    pub track_number: i32,
    /// The only user-owned field; survives re-syncs
    pub is_favorite: bool,
    pub lyrics: Option<String>,
    pub track_gain: Option<f32>,
    pub track_peak: Option<f32>,
}

/// The subset of a track needed to build a play queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TrackQueueItem {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub uri: String,
}

// =============================================================================
// Album
// =============================================================================

/// An album, keyed by [`album_id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub artist: String,
    /// Encoded thumbnail image
    pub thumbnail: Option<Vec<u8>>,
    pub palette: Option<AlbumPalette>,
    pub album_gain: Option<f32>,
    pub album_peak: Option<f32>,
}

impl Album {
    /// New album with its id derived from `artist` and `name`.
    pub fn new(name: impl Into<String>, artist: impl Into<String>) -> Self {
        let name = name.into();
        let artist = artist.into();
        Self {
            id: album_id(&artist, &name),
            name,
            artist,
            thumbnail: None,
            palette: None,
            album_gain: None,
            album_peak: None,
        }
    }
}

/// Flat row as stored in the `albums` table.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct AlbumRow {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub thumbnail: Option<Vec<u8>>,
    pub vibrant: Option<i64>,
    pub dark_vibrant: Option<i64>,
    pub light_vibrant: Option<i64>,
    pub muted: Option<i64>,
    pub dark_muted: Option<i64>,
    pub light_muted: Option<i64>,
    pub dominant: Option<i64>,
    pub album_gain: Option<f32>,
    pub album_peak: Option<f32>,
}

fn color_from_column(value: Option<i64>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

impl From<AlbumRow> for Album {
    fn from(row: AlbumRow) -> Self {
        let palette = AlbumPalette {
            vibrant: color_from_column(row.vibrant),
            dark_vibrant: color_from_column(row.dark_vibrant),
            light_vibrant: color_from_column(row.light_vibrant),
            muted: color_from_column(row.muted),
            dark_muted: color_from_column(row.dark_muted),
            light_muted: color_from_column(row.light_muted),
            dominant: color_from_column(row.dominant),
        };

        Album {
            id: row.id,
            name: row.name,
            artist: row.artist,
            thumbnail: row.thumbnail,
            palette: (!palette.is_empty()).then_some(palette),
            album_gain: row.album_gain,
            album_peak: row.album_peak,
        }
    }
}

// =============================================================================
// Artist
// =============================================================================

/// Aggregated view of one artist, derived from albums and tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistSummary {
    pub name: String,
    pub album_count: u32,
    pub track_count: u32,
    /// Up to three album thumbnails, ordered by album name
    pub thumbnails: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ArtistSummaryRow {
    pub name: String,
    pub album_count: i64,
    pub track_count: i64,
    pub thumbnail1: Option<Vec<u8>>,
    pub thumbnail2: Option<Vec<u8>>,
    pub thumbnail3: Option<Vec<u8>>,
}

impl From<ArtistSummaryRow> for ArtistSummary {
    fn from(row: ArtistSummaryRow) -> Self {
        ArtistSummary {
            name: row.name,
            album_count: u32::try_from(row.album_count).unwrap_or(u32::MAX),
            track_count: u32::try_from(row.track_count).unwrap_or(u32::MAX),
            thumbnails: [row.thumbnail1, row.thumbnail2, row.thumbnail3]
                .into_iter()
                .flatten()
                .collect(),
        }
    }
}
